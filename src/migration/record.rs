//! `AppliedMigration` - Represents entries in the `mig_versions` table

use crate::executor::GateError;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Represents one completed execution, as recorded in `mig_versions`
///
/// `version` logically references a `MigrationFile` id; the store itself has
/// no filesystem knowledge. Records are created exactly once, when a
/// migration's unit of work commits, and never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    /// Surrogate key; reflects insertion sequence
    pub id: i32,

    /// The applied migration's identifier
    pub version: String,

    /// When the migration was applied (server-assigned at write time)
    pub applied_at: DateTime<Utc>,
}

impl AppliedMigration {
    /// Create an `AppliedMigration` from a database row
    ///
    /// Expected column order: `id`, `version`, `applied_at` (as text; the
    /// query casts it so parsing is independent of the driver's timestamp
    /// decoding).
    ///
    /// # Errors
    ///
    /// Returns `GateError::ParseError` if the timestamp text is in no
    /// recognized format.
    pub fn from_row(row: &may_postgres::Row) -> Result<Self, GateError> {
        let id: i32 = row.get(0);
        let version: String = row.get(1);
        let applied_at_str: String = row.get(2);
        let applied_at = parse_timestamp(&applied_at_str)?;

        Ok(Self {
            id,
            version,
            applied_at,
        })
    }
}

/// Parse a timestamp rendered by PostgreSQL as text
///
/// `timestamptz::text` comes back as `2023-01-01 10:00:00+00` (optionally
/// with fractional seconds); plain timestamps lack the offset. Try the
/// offset-carrying formats first, then the naive fallbacks.
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, GateError> {
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    Err(GateError::ParseError(format!(
        "Failed to parse timestamp '{s}': unrecognized format"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_with_offset() {
        let dt = parse_timestamp("2023-01-01 10:00:00+00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2023-01-01T10:00:00+00:00");

        let dt = parse_timestamp("2023-01-01 10:00:00.123456+00").unwrap();
        assert_eq!(dt.timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn test_parse_timestamp_naive_fallbacks() {
        assert!(parse_timestamp("2023-01-01 10:00:00").is_ok());
        assert!(parse_timestamp("2023-01-01 10:00:00.5").is_ok());
        assert!(parse_timestamp("2023-01-01T10:00:00").is_ok());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let err = parse_timestamp("not a timestamp").unwrap_err();
        assert!(err.to_string().contains("unrecognized format"));
    }
}
