//! # Sentinel Database Crate
//!
//! This crate is the system's permanent record of signals, kept in SQLite.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All SQL lives here. The rest of the application sees the
//!   `SignalStore` trait and never touches a query.
//! - **Asynchronous & Pooled:** All operations are asynchronous and go through a
//!   connection pool, so the engine's writes never wait on a slow reader.
//!
//! ## Public API
//!
//! - `connect`: Opens the connection pool.
//! - `init_schema`: Creates the `signals` table if it is missing.
//! - `SignalStore`: The append/recent contract the engine depends on.
//! - `DbRepository`: The SQLite implementation of `SignalStore`.
//! - `DbError`: The specific error types that can be returned from this crate.

pub mod connection;
pub mod error;
pub mod repository;

pub use connection::{connect, init_schema};
pub use error::DbError;
pub use repository::{DbRepository, SignalStore};
