//! Temporal normalizer / 时间值规范化
//!
//! Turns the date/time shapes a source can produce into one canonical string
//! form and, where the value denotes a point in time, epoch milliseconds.
//! Parsing is lenient: anything unrecognized yields `None`, never an error.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};

use crate::source::{SourceValue, Temporal};

/// Canonical text of a temporal value / 时间值的规范字符串
///
/// Fractional seconds are printed only when non-zero.
pub fn format_temporal(value: &Temporal) -> String {
    match value {
        Temporal::Date(date) => date.format("%Y-%m-%d").to_string(),
        Temporal::Time(time) => time.format("%H:%M:%S%.f").to_string(),
        Temporal::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        Temporal::OffsetDateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Temporal::Instant(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
    }
}

/// String form of any source value; `Null` has none / 值的字符串形式
pub fn canonical_string(value: &SourceValue) -> Option<String> {
    match value {
        SourceValue::Null => None,
        SourceValue::Bool(b) => Some(b.to_string()),
        SourceValue::Int(i) => Some(i.to_string()),
        SourceValue::Float(f) => Some(f.to_string()),
        SourceValue::Decimal(d) => Some(d.clone()),
        SourceValue::Text(s) => Some(s.clone()),
        SourceValue::Bytes(bytes) => Some(BASE64.encode(bytes)),
        SourceValue::Temporal(t) => Some(format_temporal(t)),
    }
}

/// Parse caller-supplied time text into epoch milliseconds / 解析时间文本为毫秒时间戳
///
/// Tried in order: UTC instant, offset date-time, calendar date at midnight
/// UTC, raw integer milliseconds. First success wins.
pub fn parse_epoch_millis(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    parse_instant(text)
        .or_else(|| parse_offset_date_time(text))
        .or_else(|| parse_date(text))
        .or_else(|| text.parse::<i64>().ok())
}

/// Epoch milliseconds of a source value, when it denotes a point in time / 值对应的毫秒时间戳
///
/// Zone-less date-times are taken as UTC. A bare time of day has no epoch.
pub fn epoch_millis(value: &SourceValue) -> Option<i64> {
    match value {
        SourceValue::Temporal(Temporal::Date(date)) => midnight_utc(*date),
        SourceValue::Temporal(Temporal::Time(_)) => None,
        SourceValue::Temporal(Temporal::DateTime(dt)) => Some(naive_utc_millis(dt)),
        SourceValue::Temporal(Temporal::OffsetDateTime(dt)) => Some(dt.timestamp_millis()),
        SourceValue::Temporal(Temporal::Instant(dt)) => Some(dt.timestamp_millis()),
        SourceValue::Int(ms) => Some(*ms),
        SourceValue::Text(s) | SourceValue::Decimal(s) => parse_epoch_millis(s),
        _ => None,
    }
}

fn parse_instant(text: &str) -> Option<i64> {
    if !text.ends_with(|c| c == 'Z' || c == 'z') {
        return None;
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn parse_offset_date_time(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    // seconds may be omitted, e.g. 2024-01-01T08:30+02:00
    DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M%:z")
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn parse_date(text: &str) -> Option<i64> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(midnight_utc)
}

fn midnight_utc(date: NaiveDate) -> Option<i64> {
    let midnight = NaiveTime::from_hms_opt(0, 0, 0)?;
    Some(naive_utc_millis(&date.and_time(midnight)))
}

fn naive_utc_millis(dt: &NaiveDateTime) -> i64 {
    Utc.from_utc_datetime(dt).timestamp_millis()
}
