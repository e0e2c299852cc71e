//! Database row types. These map directly to SQLite rows.
//! Distinct from courier-types models to keep the DB layer independent.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

/// Layout of every timestamp column: UTC, millisecond precision. Sorting the
/// text sorts chronologically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp column. Accepts rows written with or without the
/// fractional part.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|ndt| ndt.and_utc())
}

/// Read and parse the timestamp at `idx`. A malformed value fails the row.
fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub struct MessageRow {
    pub mid: i64,
    pub sender_uid: i64,
    pub receiver_uid: i64,
    pub content: String,
    pub nonce: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            mid: row.get(0)?,
            sender_uid: row.get(1)?,
            receiver_uid: row.get(2)?,
            content: row.get(3)?,
            nonce: row.get(4)?,
            timestamp: timestamp_column(row, 5)?,
        })
    }
}

pub struct DecryptedMessageRow {
    pub mid: i64,
    pub sender_uid: i64,
    pub receiver_uid: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl DecryptedMessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            mid: row.get(0)?,
            sender_uid: row.get(1)?,
            receiver_uid: row.get(2)?,
            content: row.get(3)?,
            timestamp: timestamp_column(row, 4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_keep_milliseconds() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 5).unwrap()
            + chrono::Duration::milliseconds(42);
        let raw = format_timestamp(&ts);
        assert_eq!(raw, "2026-10-19 08:30:05.042");
        assert_eq!(parse_timestamp(&raw).unwrap(), ts);
    }

    #[test]
    fn whole_second_timestamps_parse() {
        let ts = parse_timestamp("2026-10-19 08:30:05").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 5).unwrap());
        assert!(parse_timestamp("yesterday").is_err());
    }
}
