//! # Floodgate
//!
//! File-based PostgreSQL schema migration engine for Rust's `may` runtime.
//!
//! Migrations are plain SQL files named `YYYY_MM_DD_HH_MM_SS_<name>.sql`,
//! applied exactly once each in timestamp order and tracked in the target
//! database itself (`mig_versions` for applied state, `mig_history` for the
//! audit trail).

pub mod config;
pub mod connection;
pub mod executor;
pub mod migration;
pub mod transaction;

pub use connection::{connect, ConnectionError};
pub use executor::{ClientExecutor, GateError, GateExecutor};
pub use transaction::{Transaction, TransactionError};
