//! Applied-state store: the `mig_versions` and `mig_history` tables
//!
//! Both tables live in the target database itself. Their names and column
//! sets are an on-disk contract with existing deployments and must not
//! change shape.

use crate::executor::GateExecutor;
use crate::migration::{AppliedMigration, MigrationError};

/// DDL for the versions table. `version` carries the uniqueness constraint
/// that makes application at-most-once.
pub const CREATE_VERSIONS_TABLE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS mig_versions (
    id SERIAL PRIMARY KEY,
    version VARCHAR(255) NOT NULL UNIQUE,
    applied_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
)";

/// DDL for the append-only history table. Never read back by the engine;
/// it exists purely for external audit.
pub const CREATE_HISTORY_TABLE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS mig_history (
    id SERIAL PRIMARY KEY,
    version VARCHAR(255) NOT NULL,
    command TEXT NOT NULL,
    executed_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
)";

/// Create the migration tables if they don't exist
///
/// Idempotent: safe to call on an already-initialized store.
///
/// # Errors
///
/// Returns `SchemaError` if either table cannot be created.
pub fn initialize_tables(executor: &dyn GateExecutor) -> Result<(), MigrationError> {
    executor
        .batch_execute(CREATE_VERSIONS_TABLE_SQL)
        .map_err(|e| {
            MigrationError::SchemaError(format!("failed to create mig_versions table: {e}"))
        })?;

    executor
        .batch_execute(CREATE_HISTORY_TABLE_SQL)
        .map_err(|e| {
            MigrationError::SchemaError(format!("failed to create mig_history table: {e}"))
        })?;

    Ok(())
}

/// Retrieve all applied migrations, ordered by insertion sequence
///
/// # Errors
///
/// Returns `QueryError` on any read or row-decode failure.
pub fn query_applied_migrations(
    executor: &dyn GateExecutor,
) -> Result<Vec<AppliedMigration>, MigrationError> {
    let rows = executor
        .query_all(
            "SELECT id, version, applied_at::text FROM mig_versions ORDER BY id",
            &[],
        )
        .map_err(|e| MigrationError::QueryError(e.to_string()))?;

    let mut applied = Vec::with_capacity(rows.len());
    for row in &rows {
        let record = AppliedMigration::from_row(row)
            .map_err(|e| MigrationError::QueryError(e.to_string()))?;
        applied.push(record);
    }

    Ok(applied)
}

/// Record a successfully applied migration
///
/// The write participates in whatever unit of work `unit` represents: pass
/// the transaction to make it atomic with the migration's statements, or the
/// plain client to commit immediately.
///
/// # Errors
///
/// Returns `WriteError` if the version already exists (uniqueness violation)
/// or on any other persistence failure.
pub fn record_version(unit: &dyn GateExecutor, version: &str) -> Result<(), MigrationError> {
    unit.execute("INSERT INTO mig_versions (version) VALUES ($1)", &[&version])
        .map_err(|e| MigrationError::WriteError {
            target: "mig_versions".to_string(),
            reason: e.to_string(),
        })?;

    Ok(())
}

/// Record an audit entry with the executed statement text
///
/// Same atomicity contract as [`record_version`].
///
/// # Errors
///
/// Returns `WriteError` on any persistence failure.
pub fn record_history(
    unit: &dyn GateExecutor,
    version: &str,
    content: &str,
) -> Result<(), MigrationError> {
    unit.execute(
        "INSERT INTO mig_history (version, command) VALUES ($1, $2)",
        &[&version, &content],
    )
    .map_err(|e| MigrationError::WriteError {
        target: "mig_history".to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}
