//! Bridge Relayer - Library interface
//!
//! Watches `MessageSent` on two paired bridge contracts and delivers each
//! message to the other chain's `receiveMessage`. Re-exports internal modules
//! for the binary and for integration tests.

pub mod api;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod coordinator;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod registry;
pub mod types;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use coordinator::RelayCoordinator;
pub use error::{RelayError, RelayResult};
pub use lifecycle::Relayer;
pub use registry::ChainRegistry;
pub use types::{RelayEvent, RelayOutcome, SkipReason};
