//! # Sentinel Core Types
//!
//! The shared vocabulary of the workspace: price bars, trading actions, signals,
//! operator commands and the engine's activation status. This crate has no
//! knowledge of I/O; every other crate depends on it.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{Action, ActivationStatus, CommandKind};
pub use error::CoreError;
pub use structs::{Bar, Command, Signal, SIGNAL_TIME_FORMAT};
