use uuid::Uuid;

use crate::db::error::{DbError, DbResult};

/// Parse a UUID string from the database, returning a DbError on failure
pub fn parse_uuid(s: &str) -> DbResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DbError::Internal(format!("Invalid UUID in database: {}", e)))
}

/// Parse a nullable UUID column
pub fn parse_optional_uuid(s: Option<String>) -> DbResult<Option<Uuid>> {
    s.filter(|s| !s.is_empty())
        .map(|s| parse_uuid(&s))
        .transpose()
}

/// Convert a stored version number, rejecting values that cannot be versions
pub fn parse_version(n: i64) -> DbResult<u32> {
    u32::try_from(n)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| DbError::Internal(format!("Invalid version number in database: {}", n)))
}
