//! Migration status reporting

use crate::migration::{AppliedMigration, MigrationFile};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Compute the pending subset: loaded migrations whose id is absent from the
/// applied set, in load order (ascending timestamp, ties by id).
///
/// Pure function of the two snapshots; performs no I/O.
pub fn pending_migrations(
    migrations: &[MigrationFile],
    applied: &[AppliedMigration],
) -> Vec<MigrationFile> {
    let applied_set: HashSet<&str> = applied.iter().map(|r| r.version.as_str()).collect();

    migrations
        .iter()
        .filter(|m| !applied_set.contains(m.id.as_str()))
        .cloned()
        .collect()
}

/// Point-in-time view of loaded migrations against applied records
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// All loaded migrations, in execution order
    pub migrations: Vec<MigrationFile>,

    /// All applied records, in insertion order
    pub applied: Vec<AppliedMigration>,

    /// Total number of loaded migrations
    pub total: usize,

    /// Number of loaded migrations that have been applied
    pub applied_count: usize,

    /// Number of loaded migrations still pending
    pub pending_count: usize,
}

impl MigrationStatus {
    /// Create a new `MigrationStatus`
    #[must_use]
    pub fn new(migrations: Vec<MigrationFile>, applied: Vec<AppliedMigration>) -> Self {
        let applied_set: HashSet<&str> = applied.iter().map(|r| r.version.as_str()).collect();
        let applied_count = migrations
            .iter()
            .filter(|m| applied_set.contains(m.id.as_str()))
            .count();
        let total = migrations.len();
        let pending_count = total - applied_count;

        Self {
            migrations,
            applied,
            total,
            applied_count,
            pending_count,
        }
    }

    /// Check if all loaded migrations are applied
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending_count == 0
    }

    /// Whether a specific migration id has been applied
    #[must_use]
    pub fn is_applied(&self, id: &str) -> bool {
        self.applied.iter().any(|r| r.version == id)
    }

    /// Applied-at timestamp for a specific migration id, if applied
    #[must_use]
    pub fn applied_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.applied
            .iter()
            .find(|r| r.version == id)
            .map(|r| r.applied_at)
    }

    /// The pending subset, in execution order
    #[must_use]
    pub fn pending(&self) -> Vec<MigrationFile> {
        pending_migrations(&self.migrations, &self.applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn migration(id: &str) -> MigrationFile {
        let (date_str, name) = id.split_at(19);
        MigrationFile {
            id: id.to_string(),
            name: name.trim_start_matches('_').to_string(),
            filename: format!("{id}.sql"),
            content: String::new(),
            disable_tx: false,
            created_at: NaiveDateTime::parse_from_str(date_str, "%Y_%m_%d_%H_%M_%S").unwrap(),
        }
    }

    fn applied(id: i32, version: &str) -> AppliedMigration {
        AppliedMigration {
            id,
            version: version.to_string(),
            applied_at: Utc::now(),
        }
    }

    #[test]
    fn test_pending_is_ordered_difference() {
        let migrations = vec![
            migration("2023_01_01_10_00_00_a"),
            migration("2023_01_02_10_00_00_b"),
            migration("2023_01_03_10_00_00_c"),
        ];
        let records = vec![applied(1, "2023_01_02_10_00_00_b")];

        let pending = pending_migrations(&migrations, &records);
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, "2023_01_01_10_00_00_a");
        assert_eq!(pending[1].id, "2023_01_03_10_00_00_c");
    }

    #[test]
    fn test_pending_empty_when_all_applied() {
        let migrations = vec![migration("2023_01_01_10_00_00_a")];
        let records = vec![applied(1, "2023_01_01_10_00_00_a")];
        assert!(pending_migrations(&migrations, &records).is_empty());
    }

    #[test]
    fn test_pending_all_when_nothing_applied() {
        let migrations = vec![
            migration("2023_01_01_10_00_00_a"),
            migration("2023_01_02_10_00_00_b"),
        ];
        let pending = pending_migrations(&migrations, &[]);
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_status_counts() {
        let migrations = vec![
            migration("2023_01_01_10_00_00_a"),
            migration("2023_01_02_10_00_00_b"),
            migration("2023_01_03_10_00_00_c"),
        ];
        let records = vec![
            applied(1, "2023_01_01_10_00_00_a"),
            applied(2, "2023_01_02_10_00_00_b"),
        ];

        let status = MigrationStatus::new(migrations, records);
        assert_eq!(status.total, 3);
        assert_eq!(status.applied_count, 2);
        assert_eq!(status.pending_count, 1);
        assert!(!status.is_up_to_date());
        assert!(status.is_applied("2023_01_01_10_00_00_a"));
        assert!(!status.is_applied("2023_01_03_10_00_00_c"));
        assert!(status.applied_at("2023_01_01_10_00_00_a").is_some());
        assert!(status.applied_at("2023_01_03_10_00_00_c").is_none());

        let pending = status.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "2023_01_03_10_00_00_c");
    }

    #[test]
    fn test_status_ignores_applied_records_without_files() {
        // A record whose file has been deleted still shows in `applied`
        // but does not affect the loaded-migration counts.
        let migrations = vec![migration("2023_01_02_10_00_00_b")];
        let records = vec![
            applied(1, "2023_01_01_10_00_00_gone"),
            applied(2, "2023_01_02_10_00_00_b"),
        ];

        let status = MigrationStatus::new(migrations, records);
        assert_eq!(status.total, 1);
        assert_eq!(status.applied_count, 1);
        assert_eq!(status.pending_count, 0);
        assert!(status.is_up_to_date());
    }
}
