//! Migration-specific error types

use std::fmt;

/// Migration-specific errors
///
/// Load-time errors (`NotFound`, `ParseError`, `ReadError`, `DuplicateId`)
/// abort before any execution begins. Execution-time errors abort the current
/// batch immediately but leave the engine inspectable.
#[derive(Debug)]
pub enum MigrationError {
    /// Migrations directory (or another required path) does not exist
    NotFound(String),
    /// Malformed timestamp in a migration filename; poisons the whole load
    ParseError { filename: String, reason: String },
    /// Filesystem read failure
    ReadError { path: String, reason: String },
    /// Filesystem or applied-state write failure
    WriteError { target: String, reason: String },
    /// Migration file with this exact filename already exists
    AlreadyExists(String),
    /// Two migration files resolved to the same identifier
    DuplicateId(String),
    /// Migration state tables could not be created
    SchemaError(String),
    /// Applied-state read failure
    QueryError(String),
    /// Migration failed during execution or recording
    ExecutionError { id: String, reason: String },
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationError::NotFound(path) => {
                write!(f, "Migrations directory does not exist: {path}")
            }
            MigrationError::ParseError { filename, reason } => {
                write!(
                    f,
                    "Invalid date format in migration filename {filename}: {reason}"
                )
            }
            MigrationError::ReadError { path, reason } => {
                write!(f, "Failed to read {path}: {reason}")
            }
            MigrationError::WriteError { target, reason } => {
                write!(f, "Failed to write {target}: {reason}")
            }
            MigrationError::AlreadyExists(filename) => {
                write!(f, "Migration file already exists: {filename}")
            }
            MigrationError::DuplicateId(id) => {
                write!(f, "Duplicate migration identifier: {id}")
            }
            MigrationError::SchemaError(reason) => {
                write!(f, "Failed to initialize migration tables: {reason}")
            }
            MigrationError::QueryError(reason) => {
                write!(f, "Failed to query applied migrations: {reason}")
            }
            MigrationError::ExecutionError { id, reason } => {
                write!(f, "Migration '{id}' failed during execution: {reason}")
            }
        }
    }
}

impl std::error::Error for MigrationError {}
