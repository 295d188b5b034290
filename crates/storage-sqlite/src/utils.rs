//! Conversion helpers for Text-backed columns.
//!
//! Decimals and timestamps are stored as text. Timestamps use a fixed-width
//! RFC 3339 form (UTC, microsecond precision) so that string comparison in
//! SQL matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Formats a timestamp for storage. Fixed width keeps `>=` filters and
/// `MAX()` on the column chronologically correct.
pub fn format_datetime(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn format_datetime_opt(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(format_datetime)
}

/// Parses a stored timestamp, falling back to the Unix epoch on corrupt
/// data rather than failing the whole row.
pub fn parse_datetime_tolerant(raw: &str, field_name: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            log::error!("Failed to parse {} '{}': {}", field_name, raw, e);
            DateTime::<Utc>::UNIX_EPOCH
        }
    }
}

pub fn parse_datetime_opt_tolerant(raw: Option<&str>, field_name: &str) -> Option<DateTime<Utc>> {
    raw.map(|s| parse_datetime_tolerant(s, field_name))
}

/// Parses a stored decimal, falling back to zero on corrupt data.
pub fn parse_decimal_tolerant(raw: &str, field_name: &str) -> Decimal {
    match Decimal::from_str(raw) {
        Ok(d) => d,
        Err(e) => {
            log::error!("Failed to parse {} '{}': {}", field_name, raw, e);
            Decimal::ZERO
        }
    }
}

pub fn parse_decimal_opt_tolerant(raw: Option<&str>, field_name: &str) -> Option<Decimal> {
    raw.map(|s| parse_decimal_tolerant(s, field_name))
}
