//! Shared types and result aliases for the database layer

pub mod errors;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

pub use errors::{DatabaseError, StoreError};

pub type DatabaseResult<T> = Result<T, DatabaseError>;
pub type StoreResult<T> = Result<T, StoreError>;

/// Current time at the precision timestamps are stored with.
pub fn now_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 form, so stored timestamps sort lexicographically.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(format!("bad timestamp {value:?}: {e}")))
}
