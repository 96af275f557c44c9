//! Migrator - Core migration execution engine

use crate::executor::{ClientExecutor, GateExecutor};
use crate::migration::state_table::{
    initialize_tables, query_applied_migrations, record_history, record_version,
};
use crate::migration::{
    load_migrations, pending_migrations, AppliedMigration, MigrationError, MigrationFile,
    MigrationStatus,
};
use log::{debug, info};
use std::path::Path;

/// Core migration execution engine
///
/// The `Migrator` owns one database connection for its lifetime, the ordered
/// list of loaded migrations, and a cached snapshot of the applied set. Both
/// snapshots are taken at construction and refreshed only by execution or an
/// explicit `status()` call, never kept live.
///
/// Single-threaded and sequential by design: one migration at a time,
/// end-to-end. Nothing coordinates competing `Migrator` instances against the
/// same database; if two race, the loser of the `mig_versions` uniqueness
/// constraint gets an `ExecutionError`.
pub struct Migrator {
    executor: ClientExecutor,
    migrations: Vec<MigrationFile>,
    applied: Vec<AppliedMigration>,
}

impl Migrator {
    /// Create a new Migrator
    ///
    /// Initializes the state tables (idempotent), caches the applied set and
    /// loads the migration files from `migrations_dir`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the state tables cannot be created,
    /// `QueryError` if the applied set cannot be read, or any load-time error
    /// from [`load_migrations`]. Load-time errors abort before any execution
    /// begins.
    pub fn new(
        executor: ClientExecutor,
        migrations_dir: impl AsRef<Path>,
    ) -> Result<Self, MigrationError> {
        initialize_tables(&executor)?;
        let applied = query_applied_migrations(&executor)?;
        let migrations = load_migrations(migrations_dir.as_ref())?;

        debug!(
            "migrator ready: {} migration(s) loaded, {} applied",
            migrations.len(),
            applied.len()
        );

        Ok(Self {
            executor,
            migrations,
            applied,
        })
    }

    /// All loaded migrations, in execution order
    pub fn migrations(&self) -> &[MigrationFile] {
        &self.migrations
    }

    /// The cached applied records, in insertion order
    pub fn applied(&self) -> &[AppliedMigration] {
        &self.applied
    }

    /// Migrations that have not been applied yet, in execution order
    ///
    /// Pure function of the two cached snapshots; does not query the store.
    pub fn pending(&self) -> Vec<MigrationFile> {
        pending_migrations(&self.migrations, &self.applied)
    }

    /// Execute a single migration
    ///
    /// By default the migration body, the version record and the history
    /// record run in one transaction: all-or-nothing, so a migration is never
    /// recorded without its statements committing and never commits without
    /// being recorded.
    ///
    /// A migration carrying the disabling directive runs directly on the
    /// connection instead (required for statements that refuse to run inside
    /// a transaction block, e.g. `CREATE INDEX CONCURRENTLY`), and the two
    /// records commit independently afterwards. If the body succeeds but the
    /// record write then fails, the schema is mutated yet the migration stays
    /// unrecorded and will be re-attempted on the next run; that asymmetry is
    /// inherent to the disabled path and deliberately not papered over.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError` wrapping the migration id and the underlying
    /// cause.
    pub fn execute_migration(&self, migration: &MigrationFile) -> Result<(), MigrationError> {
        if migration.disable_tx {
            info!("applying migration {} (no transaction)", migration.id);

            self.executor
                .batch_execute(&migration.content)
                .map_err(|e| execution_error(&migration.id, e))?;

            record_version(&self.executor, &migration.id)
                .map_err(|e| execution_error(&migration.id, e))?;
            record_history(&self.executor, &migration.id, &migration.content)
                .map_err(|e| execution_error(&migration.id, e))?;
        } else {
            info!("applying migration {}", migration.id);

            let tx = self
                .executor
                .begin()
                .map_err(|e| execution_error(&migration.id, e))?;

            if let Err(e) = tx.batch_execute(&migration.content) {
                let _ = tx.rollback();
                return Err(execution_error(&migration.id, e));
            }

            if let Err(e) = record_version(&tx, &migration.id) {
                let _ = tx.rollback();
                return Err(execution_error(&migration.id, e));
            }

            if let Err(e) = record_history(&tx, &migration.id, &migration.content) {
                let _ = tx.rollback();
                return Err(execution_error(&migration.id, e));
            }

            tx.commit()
                .map_err(|e| execution_error(&migration.id, e))?;
        }

        Ok(())
    }

    /// Execute the next pending migration
    ///
    /// Returns whether a migration ran. On success the cached applied set is
    /// refreshed from the store (a full re-fetch, not an incremental merge).
    ///
    /// # Errors
    ///
    /// Propagates the first error encountered. The engine stays usable for
    /// inspection; the failed migration is not retried automatically.
    pub fn execute_next(&mut self) -> Result<bool, MigrationError> {
        let pending = self.pending();
        let Some(next) = pending.first() else {
            return Ok(false);
        };

        self.execute_migration(next)?;

        self.applied = query_applied_migrations(&self.executor)?;
        Ok(true)
    }

    /// Execute all pending migrations, stopping at the first failure
    ///
    /// Returns the number of migrations executed. Later migrations may depend
    /// on earlier ones having applied cleanly, so there is no best-effort
    /// continuation past a failure; re-running after a partial failure
    /// resumes from the first still-pending migration in the same order.
    ///
    /// # Errors
    ///
    /// Propagates the first error; the count applied before the failure is
    /// reported through the logger.
    pub fn execute_all(&mut self) -> Result<usize, MigrationError> {
        let mut count = 0;

        loop {
            match self.execute_next() {
                Ok(true) => count += 1,
                Ok(false) => break,
                Err(e) => {
                    log::error!("aborting after {count} applied migration(s): {e}");
                    return Err(e);
                }
            }
        }

        Ok(count)
    }

    /// Migration status: all loaded migrations against all applied records
    ///
    /// Refreshes the applied records from the store first, so the result
    /// reflects reality even after a failed batch.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if the applied set cannot be read.
    pub fn status(&mut self) -> Result<MigrationStatus, MigrationError> {
        self.applied = query_applied_migrations(&self.executor)?;

        Ok(MigrationStatus::new(
            self.migrations.clone(),
            self.applied.clone(),
        ))
    }

    /// Release the database connection
    ///
    /// The connection is exclusively owned by the engine and released exactly
    /// once, here.
    pub fn close(self) {
        drop(self.executor);
    }
}

fn execution_error(id: &str, cause: impl std::fmt::Display) -> MigrationError {
    MigrationError::ExecutionError {
        id: id.to_string(),
        reason: cause.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_wraps_id_and_cause() {
        let err = execution_error("2023_01_01_10_00_00_x", "relation does not exist");
        match err {
            MigrationError::ExecutionError { id, reason } => {
                assert_eq!(id, "2023_01_01_10_00_00_x");
                assert!(reason.contains("relation does not exist"));
            }
            other => panic!("expected ExecutionError, got {other:?}"),
        }
    }
}
