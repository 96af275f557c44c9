//! Migration file discovery and creation
//!
//! Migration files are named `YYYY_MM_DD_HH_MM_SS_<name>.sql` where the name
//! segment is restricted to `[A-Za-z0-9_]`. Files that do not match the
//! pattern are ignored so the directory can hold stray documentation; a file
//! whose timestamp has the right shape but is not a valid calendar timestamp
//! poisons the whole load, since executing a partial migration set is unsafe.

use crate::migration::MigrationError;
use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Directive token that opts a migration out of transactional execution.
///
/// Detected by substring search anywhere in the file body. The exact token is
/// part of the compatibility contract with existing migration files.
pub const DISABLE_TX_DIRECTIVE: &str = "-- disable-tx";

const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

// Migration filename pattern: YYYY_MM_DD_HH_MM_SS_name.sql
static MIGRATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}_\d{2}_\d{2}_\d{2}_\d{2}_\d{2})_([A-Za-z0-9_]+)\.sql$")
        .expect("migration filename pattern is valid")
});

static SANITIZE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("sanitize pattern is valid"));

/// Represents a single discovered migration file
///
/// Constructed once per load call and immutable thereafter. Only the `id` is
/// ever persisted (as the idempotency key in the applied-state store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Unique identifier: `<timestamp>_<name>` (filename without extension)
    pub id: String,

    /// Human-readable name part of the migration
    pub name: String,

    /// Full filename
    pub filename: String,

    /// Raw statement text; opaque to the engine
    pub content: String,

    /// Whether the disabling directive was found in the content
    pub disable_tx: bool,

    /// Creation time parsed from the filename; used for ordering only
    pub created_at: NaiveDateTime,
}

/// Load all migration files from the specified directory
///
/// Subdirectories and files that do not match the filename pattern are
/// silently skipped. The result is ordered ascending by timestamp, with ties
/// broken by ascending identifier; this ordering is the authoritative
/// execution order and is deterministic across repeated loads of an
/// unchanged directory.
///
/// # Errors
///
/// - `NotFound` if the directory does not exist
/// - `ReadError` if the directory or a matching file cannot be read
/// - `ParseError` if a matching filename carries an invalid calendar
///   timestamp (aborts the whole load)
/// - `DuplicateId` if two files resolve to the same identifier
pub fn load_migrations(directory: &Path) -> Result<Vec<MigrationFile>, MigrationError> {
    if !directory.exists() {
        return Err(MigrationError::NotFound(
            directory.to_string_lossy().to_string(),
        ));
    }

    let entries = fs::read_dir(directory).map_err(|e| MigrationError::ReadError {
        path: directory.to_string_lossy().to_string(),
        reason: e.to_string(),
    })?;

    let mut migrations = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| MigrationError::ReadError {
            path: directory.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;

        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let Some(caps) = MIGRATION_PATTERN.captures(filename) else {
            // Not a migration file; stray files are allowed in the directory.
            continue;
        };

        let date_str = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let name = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        // Shape already matched; anything chrono rejects here is a bogus
        // calendar date such as month 13, which poisons the batch.
        let created_at = NaiveDateTime::parse_from_str(date_str, TIMESTAMP_FORMAT).map_err(
            |e| MigrationError::ParseError {
                filename: filename.to_string(),
                reason: e.to_string(),
            },
        )?;

        let content = fs::read_to_string(&path).map_err(|e| MigrationError::ReadError {
            path: path.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;

        let disable_tx = content.contains(DISABLE_TX_DIRECTIVE);

        migrations.push(MigrationFile {
            id: format!("{date_str}_{name}"),
            name: name.to_string(),
            filename: filename.to_string(),
            content,
            disable_tx,
            created_at,
        });
    }

    // Sort by date, then by id for same date.
    migrations.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    for pair in migrations.windows(2) {
        if pair[0].id == pair[1].id {
            return Err(MigrationError::DuplicateId(pair[0].id.clone()));
        }
    }

    Ok(migrations)
}

/// Create a new migration file
///
/// Ensures `directory` exists (creating it if missing), stamps the current
/// instant as the timestamp component, sanitizes `name` (spaces become
/// underscores, everything outside `[A-Za-z0-9_]` is stripped) and writes a
/// templated placeholder body. Returns the generated filename.
///
/// # Errors
///
/// - `AlreadyExists` if the exact target filename already exists (a
///   collision at second granularity)
/// - `WriteError` if the directory or file cannot be created
pub fn create_migration_file(directory: &Path, name: &str) -> Result<String, MigrationError> {
    fs::create_dir_all(directory).map_err(|e| MigrationError::WriteError {
        target: directory.to_string_lossy().to_string(),
        reason: e.to_string(),
    })?;

    let now = Local::now();
    let date_str = now.format(TIMESTAMP_FORMAT).to_string();
    let sanitized = sanitize_name(name);

    let filename = format!("{date_str}_{sanitized}.sql");
    let path = directory.join(&filename);

    if path.exists() {
        return Err(MigrationError::AlreadyExists(filename));
    }

    let template = format!(
        "-- Migration: {sanitized}\n\
         -- Created at: {created}\n\
         --\n\
         -- Note:\n\
         -- Add \"{directive}\" anywhere in this file to disable transaction wrapping.\n\
         \n\
         -- Your SQL goes here\n",
        created = now.format("%Y-%m-%d %H:%M:%S"),
        directive = DISABLE_TX_DIRECTIVE,
    );

    fs::write(&path, template).map_err(|e| MigrationError::WriteError {
        target: path.to_string_lossy().to_string(),
        reason: e.to_string(),
    })?;

    Ok(filename)
}

/// Sanitize a migration name: spaces to underscores, strip everything
/// outside `[A-Za-z0-9_]`.
pub fn sanitize_name(name: &str) -> String {
    SANITIZE_PATTERN
        .replace_all(&name.replace(' ', "_"), "")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_migration(dir: &Path, filename: &str, content: &str) {
        fs::write(dir.join(filename), content).unwrap();
    }

    #[test]
    fn test_load_nonexistent_directory() {
        let result = load_migrations(Path::new("/nonexistent/path/that/does/not/exist"));
        assert!(matches!(result, Err(MigrationError::NotFound(_))));
    }

    #[test]
    fn test_load_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let migrations = load_migrations(temp_dir.path()).unwrap();
        assert!(migrations.is_empty());
    }

    #[test]
    fn test_load_orders_by_timestamp_then_id() {
        let temp_dir = TempDir::new().unwrap();
        // Written out of order on purpose.
        write_migration(
            temp_dir.path(),
            "2023_01_02_10_00_00_add_email.sql",
            "ALTER TABLE users ADD COLUMN email TEXT;",
        );
        write_migration(
            temp_dir.path(),
            "2023_01_01_10_00_00_create_users.sql",
            "CREATE TABLE users (id SERIAL PRIMARY KEY, name TEXT);",
        );
        write_migration(
            temp_dir.path(),
            "2023_01_03_10_00_00_disable_tx.sql",
            "-- disable-tx\nCREATE INDEX idx_users_email ON users(email);",
        );

        let migrations = load_migrations(temp_dir.path()).unwrap();
        assert_eq!(migrations.len(), 3);
        assert_eq!(migrations[0].id, "2023_01_01_10_00_00_create_users");
        assert_eq!(migrations[1].id, "2023_01_02_10_00_00_add_email");
        assert_eq!(migrations[2].id, "2023_01_03_10_00_00_disable_tx");

        assert!(!migrations[0].disable_tx);
        assert!(!migrations[1].disable_tx);
        assert!(migrations[2].disable_tx);
        assert_eq!(migrations[0].name, "create_users");
    }

    #[test]
    fn test_load_tie_broken_by_id() {
        let temp_dir = TempDir::new().unwrap();
        write_migration(temp_dir.path(), "2023_01_01_10_00_00_bbb.sql", "SELECT 2;");
        write_migration(temp_dir.path(), "2023_01_01_10_00_00_aaa.sql", "SELECT 1;");

        let migrations = load_migrations(temp_dir.path()).unwrap();
        assert_eq!(migrations[0].id, "2023_01_01_10_00_00_aaa");
        assert_eq!(migrations[1].id, "2023_01_01_10_00_00_bbb");
    }

    #[test]
    fn test_load_skips_non_matching_files_and_subdirs() {
        let temp_dir = TempDir::new().unwrap();
        write_migration(
            temp_dir.path(),
            "2023_01_01_10_00_00_create_users.sql",
            "CREATE TABLE users (id SERIAL PRIMARY KEY);",
        );
        write_migration(temp_dir.path(), "invalid_migration.sql", "SELECT 1;");
        write_migration(temp_dir.path(), "README.md", "docs");
        write_migration(
            temp_dir.path(),
            "2023_01_01_10_00_00_bad-name.sql",
            "SELECT 1;",
        );
        fs::create_dir(temp_dir.path().join("2023_01_05_10_00_00_subdir.sql")).unwrap();

        let migrations = load_migrations(temp_dir.path()).unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].id, "2023_01_01_10_00_00_create_users");
    }

    #[test]
    fn test_load_invalid_calendar_timestamp_poisons_batch() {
        let temp_dir = TempDir::new().unwrap();
        write_migration(
            temp_dir.path(),
            "2023_01_01_10_00_00_good.sql",
            "SELECT 1;",
        );
        // Month 13: right shape, not a real date.
        write_migration(temp_dir.path(), "2023_13_01_10_00_00_bad.sql", "SELECT 1;");

        let result = load_migrations(temp_dir.path());
        match result {
            Err(MigrationError::ParseError { filename, .. }) => {
                assert_eq!(filename, "2023_13_01_10_00_00_bad.sql");
            }
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn test_directive_detected_anywhere_in_content() {
        let temp_dir = TempDir::new().unwrap();
        write_migration(
            temp_dir.path(),
            "2023_01_01_10_00_00_tail.sql",
            "CREATE INDEX CONCURRENTLY idx ON t(c);\n-- disable-tx\n",
        );

        let migrations = load_migrations(temp_dir.path()).unwrap();
        assert!(migrations[0].disable_tx);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Add Users Table!"), "Add_Users_Table");
        assert_eq!(sanitize_name("add.email-column"), "addemailcolumn");
        assert_eq!(sanitize_name("already_clean_42"), "already_clean_42");
    }

    #[test]
    fn test_create_then_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("migrations");

        let filename = create_migration_file(&dir, "Add Users Table!").unwrap();
        assert!(filename.ends_with("_Add_Users_Table.sql"));

        let migrations = load_migrations(&dir).unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].name, "Add_Users_Table");
        assert!(migrations[0].content.contains(DISABLE_TX_DIRECTIVE));
        // The template documents the directive, and detection is a plain
        // substring search, so a fresh file starts out directive-disabled.
        assert!(migrations[0].disable_tx);
    }

    #[test]
    fn test_create_collision_at_second_granularity() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();

        create_migration_file(&dir, "dup").unwrap();

        // The second call collides unless the wall clock ticked over between
        // calls; one retry makes the collision certain.
        let mut second = create_migration_file(&dir, "dup");
        for _ in 0..2 {
            if second.is_err() {
                break;
            }
            second = create_migration_file(&dir, "dup");
        }
        assert!(matches!(second, Err(MigrationError::AlreadyExists(_))));
    }
}
