//! Client facade: connection lifecycle, sending, and listener registration.
//!
//! # Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`builder`] | Configuration builder with eager validation |
//! | [`core`] | The [`WebSocketClient`] facade and its dispatch loop |
//! | [`state`] | The [`ConnectionState`] lifecycle machine |

// ============================================================================
// Submodules
// ============================================================================

pub(crate) mod builder;
pub(crate) mod core;
pub(crate) mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use self::core::WebSocketClient;
pub use state::ConnectionState;
