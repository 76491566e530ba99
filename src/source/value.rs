//! Decoded source values / 源数据库的取值模型
//!
//! Every adapter decodes a column into one of these shapes. Nothing past the
//! adapter ever looks at a driver-specific type.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Recognized temporal shapes / 可识别的时间类型
#[derive(Debug, Clone, PartialEq)]
pub enum Temporal {
    Date(NaiveDate),
    Time(NaiveTime),
    /// Wall-clock date and time without a zone (MySQL `DATETIME`)
    DateTime(NaiveDateTime),
    OffsetDateTime(DateTime<FixedOffset>),
    /// A point on the UTC timeline (MySQL `TIMESTAMP`)
    Instant(DateTime<Utc>),
}

/// One column value as read from the source / 单个列值
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact decimal, kept as its textual form
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
    Temporal(Temporal),
}

impl From<&str> for SourceValue {
    fn from(value: &str) -> Self {
        SourceValue::Text(value.to_string())
    }
}

impl From<String> for SourceValue {
    fn from(value: String) -> Self {
        SourceValue::Text(value)
    }
}

impl From<i64> for SourceValue {
    fn from(value: i64) -> Self {
        SourceValue::Int(value)
    }
}

impl From<bool> for SourceValue {
    fn from(value: bool) -> Self {
        SourceValue::Bool(value)
    }
}

impl From<Temporal> for SourceValue {
    fn from(value: Temporal) -> Self {
        SourceValue::Temporal(value)
    }
}

impl<T: Into<SourceValue>> From<Option<T>> for SourceValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SourceValue::Null)
    }
}

/// One row of a table scan, columns in result-set order / 一行扫描结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    values: Vec<(String, SourceValue)>,
}

impl SourceRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<SourceValue>) {
        self.values.push((column.into(), value.into()));
    }

    /// Builder-style push, mostly for tests and fixtures
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SourceValue>) -> Self {
        self.push(column, value);
        self
    }

    /// Value of a column; exact name first, then ASCII case-insensitive.
    pub fn get(&self, column: &str) -> Option<&SourceValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .or_else(|| {
                self.values
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(column))
            })
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
