//! Contract ABI definitions for the bridge contracts

pub mod bridge;

pub use bridge::MessageBridge;
