//! Database repositories for the tracker core
//!
//! One module per table group; row structs live beside the queries that
//! load and store them. Uuids are stored as TEXT, timestamps as RFC3339
//! TEXT, business dates as ISO `YYYY-MM-DD` TEXT.

pub mod lookups;
pub mod movements;
pub mod placements;
pub mod sequences;

use amt_common::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Parse a TEXT guid column
pub(crate) fn parse_guid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Malformed guid '{}' in database: {}", value, e)))
}

/// Parse an RFC3339 TEXT timestamp column
pub(crate) fn parse_utc(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Malformed timestamp '{}' in database: {}", value, e)))
}

/// Parse an ISO `YYYY-MM-DD` TEXT date column
pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| Error::Internal(format!("Malformed date '{}' in database: {}", value, e)))
}

pub(crate) fn opt_guid(value: Option<String>) -> Result<Option<Uuid>> {
    value.as_deref().map(parse_guid).transpose()
}

pub(crate) fn opt_utc(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_utc).transpose()
}

pub(crate) fn opt_date(value: Option<String>) -> Result<Option<NaiveDate>> {
    value.as_deref().map(parse_date).transpose()
}
