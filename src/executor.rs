//! `GateExecutor` Module
//!
//! Provides the `GateExecutor` trait that abstracts database execution over `may_postgres`.
//!
//! Everything the migration engine does against the database goes through this trait,
//! so a statement can run either on the autocommitting client (`ClientExecutor`) or
//! inside a transaction (`crate::transaction::Transaction`) without the caller caring
//! which one it was handed.

use may_postgres::types::ToSql;
use may_postgres::{Client, Error as PostgresError, Row};
use std::fmt;

/// `GateExecutor` error type
#[derive(Debug)]
pub enum GateError {
    /// `PostgreSQL` error from `may_postgres`
    PostgresError(PostgresError),
    /// Query execution error
    QueryError(String),
    /// Row parsing/conversion error
    ParseError(String),
    /// Other execution errors
    Other(String),
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::PostgresError(e) => {
                write!(f, "PostgreSQL error: {e}")
            }
            GateError::QueryError(s) => {
                write!(f, "Query error: {s}")
            }
            GateError::ParseError(s) => {
                write!(f, "Parse error: {s}")
            }
            GateError::Other(s) => {
                write!(f, "Execution error: {s}")
            }
        }
    }
}

impl std::error::Error for GateError {}

impl From<PostgresError> for GateError {
    fn from(err: PostgresError) -> Self {
        GateError::PostgresError(err)
    }
}

/// Trait for executing database operations
///
/// This is the unit-of-work seam of the crate: `ClientExecutor` implements it with
/// autocommit semantics (every statement commits immediately), and `Transaction`
/// implements it with deferred semantics (nothing is durable until `commit()`).
/// The applied-state store takes `&dyn GateExecutor`, so a version record write
/// participates in whatever unit the caller passes in.
pub trait GateExecutor {
    /// Execute a single SQL statement and return the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `GateError` if the statement fails.
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, GateError>;

    /// Execute a query and return all rows
    ///
    /// # Errors
    ///
    /// Returns `GateError` if the query execution fails.
    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, GateError>;

    /// Execute a batch of SQL statements through the simple-query protocol
    ///
    /// Migration bodies are opaque text and may contain any number of statements
    /// separated by semicolons, which the extended (prepared) protocol rejects.
    ///
    /// # Errors
    ///
    /// Returns `GateError` if any statement in the batch fails.
    fn batch_execute(&self, query: &str) -> Result<(), GateError>;
}

/// Implementation of `GateExecutor` for `may_postgres::Client`
///
/// This is the primary executor implementation: statements run directly on the
/// connection and commit immediately.
pub struct ClientExecutor {
    client: Client,
}

impl ClientExecutor {
    /// Create a new executor from a `may_postgres::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Start a new transaction
    ///
    /// The transaction must be committed or rolled back before its changes
    /// become visible (or disappear).
    ///
    /// # Errors
    ///
    /// Returns `TransactionError` if the transaction cannot be started.
    pub fn begin(
        &self,
    ) -> Result<crate::transaction::Transaction, crate::transaction::TransactionError> {
        crate::transaction::Transaction::new(self.client.clone())
    }
}

impl GateExecutor for ClientExecutor {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, GateError> {
        self.client
            .execute(query, params)
            .map_err(GateError::PostgresError)
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, GateError> {
        self.client
            .query(query, params)
            .map_err(GateError::PostgresError)
    }

    fn batch_execute(&self, query: &str) -> Result<(), GateError> {
        self.client
            .batch_execute(query)
            .map_err(GateError::PostgresError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_error_display() {
        let err = GateError::QueryError("test error".to_string());
        assert!(err.to_string().contains("Query error"));
    }

    #[test]
    fn test_gate_error_all_variants() {
        let err2 = GateError::QueryError("test".to_string());
        assert!(err2.to_string().contains("Query error"));

        let err3 = GateError::ParseError("test".to_string());
        assert!(err3.to_string().contains("Parse error"));

        let err4 = GateError::Other("test".to_string());
        assert!(err4.to_string().contains("Execution error"));
    }

    #[test]
    fn test_gate_error_display_format() {
        let err = GateError::QueryError("test query error".to_string());
        let display = err.to_string();
        assert!(display.contains("Query error"));
        assert!(display.contains("test query error"));
    }
}
