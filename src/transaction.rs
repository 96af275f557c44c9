//! Transaction Module
//!
//! Provides transaction support for Floodgate.
//!
//! A `Transaction` is a `GateExecutor`, so it can be handed to the applied-state
//! store in place of the plain client: the migration body, the version record
//! and the history record then commit or roll back as one unit.

use crate::executor::{GateError, GateExecutor};
use may_postgres::types::ToSql;
use may_postgres::{Client, Error as PostgresError, Row};
use std::fmt;

/// Transaction error type
#[derive(Debug)]
pub enum TransactionError {
    /// PostgreSQL error from may_postgres
    PostgresError(PostgresError),
    /// Transaction already committed or rolled back
    TransactionClosed,
    /// Other transaction errors
    Other(String),
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionError::PostgresError(e) => {
                write!(f, "PostgreSQL error: {e}")
            }
            TransactionError::TransactionClosed => {
                write!(f, "Transaction has already been committed or rolled back")
            }
            TransactionError::Other(s) => {
                write!(f, "Transaction error: {s}")
            }
        }
    }
}

impl std::error::Error for TransactionError {}

impl From<PostgresError> for TransactionError {
    fn from(err: PostgresError) -> Self {
        TransactionError::PostgresError(err)
    }
}

impl From<TransactionError> for GateError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::PostgresError(e) => GateError::PostgresError(e),
            TransactionError::TransactionClosed => {
                GateError::Other("Transaction closed".to_string())
            }
            TransactionError::Other(s) => GateError::Other(s),
        }
    }
}

/// A database transaction
///
/// All operations within a transaction are either committed together or rolled
/// back together. The client handle is cloned, so the transaction does not
/// borrow from the executor that started it.
pub struct Transaction {
    client: Client,
    closed: bool,
}

impl Transaction {
    /// Create a new transaction from a client
    ///
    /// Issues `BEGIN` on the connection. Transaction control statements go
    /// through the simple-query protocol.
    pub(crate) fn new(client: Client) -> Result<Self, TransactionError> {
        client
            .batch_execute("BEGIN")
            .map_err(TransactionError::from)?;

        Ok(Self {
            client,
            closed: false,
        })
    }

    /// Commit the transaction
    ///
    /// After committing, the transaction is closed and cannot be used for
    /// further operations.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction has already been committed or rolled back.
    pub fn commit(mut self) -> Result<(), TransactionError> {
        if self.closed {
            return Err(TransactionError::TransactionClosed);
        }

        self.client
            .batch_execute("COMMIT")
            .map_err(TransactionError::from)?;

        self.closed = true;
        Ok(())
    }

    /// Rollback the transaction
    ///
    /// All changes made within the transaction are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction has already been committed or rolled back.
    pub fn rollback(mut self) -> Result<(), TransactionError> {
        if self.closed {
            return Err(TransactionError::TransactionClosed);
        }

        self.client
            .batch_execute("ROLLBACK")
            .map_err(TransactionError::from)?;

        self.closed = true;
        Ok(())
    }

    /// Check if the transaction is closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl GateExecutor for Transaction {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, GateError> {
        if self.closed {
            return Err(GateError::Other("Transaction is closed".to_string()));
        }

        self.client
            .execute(query, params)
            .map_err(GateError::PostgresError)
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, GateError> {
        if self.closed {
            return Err(GateError::Other("Transaction is closed".to_string()));
        }

        self.client
            .query(query, params)
            .map_err(GateError::PostgresError)
    }

    fn batch_execute(&self, query: &str) -> Result<(), GateError> {
        if self.closed {
            return Err(GateError::Other("Transaction is closed".to_string()));
        }

        self.client
            .batch_execute(query)
            .map_err(GateError::PostgresError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_error_display() {
        let err = TransactionError::TransactionClosed;
        assert!(err
            .to_string()
            .contains("Transaction has already been committed"));

        let err2 = TransactionError::Other("test error".to_string());
        assert!(err2.to_string().contains("Transaction error"));
    }

    #[test]
    fn test_transaction_error_conversion() {
        let err = TransactionError::TransactionClosed;
        let gate_err: GateError = err.into();
        assert!(gate_err.to_string().contains("Transaction closed"));

        let err2 = TransactionError::Other("other error".to_string());
        let gate_err2: GateError = err2.into();
        assert!(gate_err2.to_string().contains("other error"));
    }
}
