//! SQLite source adapter / SQLite 数据源
//!
//! Metadata comes from `sqlite_master` and `pragma_table_info`. SQLite is
//! dynamically typed, so values are decoded by their storage class and the
//! declared column type only decides whether text is read as a date/time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use futures::StreamExt;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use async_trait::async_trait;

use super::{forward_rows, redact_url, row_channel, RowStream, SourceDatabase, SourceRow, SourceValue, Temporal};
use crate::error::{Error, Result};

pub struct SqliteSource {
    pool: SqlitePool,
}

impl SqliteSource {
    /// Connect to a SQLite database file / 连接SQLite数据库
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect(url)
            .await?;

        tracing::info!("Connected to SQLite source: {}", redact_url(url));
        Ok(Self { pool })
    }

    /// Use an existing connection pool / 使用现有连接池
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceDatabase for SqliteSource {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND substr(name, 1, 7) <> 'sqlite_'",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(names.into_iter().filter(|n| !n.trim().is_empty()).collect())
    }

    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys.into_iter().filter(|k| !k.trim().is_empty()).collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>> {
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
                .bind(table)
                .fetch_all(&self.pool)
                .await?;
        Ok(columns)
    }

    fn stream_rows(&self, table: &str, fetch_size: usize) -> RowStream {
        let pool = self.pool.clone();
        let sql = format!("SELECT * FROM {}", quote_ident(table));
        let (tx, stream) = row_channel(fetch_size);

        tokio::spawn(async move {
            let rows = sqlx::query(&sql)
                .fetch(&pool)
                .map(|row| row.map_err(Error::from).and_then(|r| decode_row(&r)));
            forward_rows(rows, tx).await;
        });
        stream
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn decode_row(row: &SqliteRow) -> Result<SourceRow> {
    let mut out = SourceRow::with_capacity(row.len());
    for column in row.columns() {
        let index = column.ordinal();
        let declared = column.type_info().name().to_ascii_uppercase();

        let storage = {
            let raw = row.try_get_raw(index)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_ascii_uppercase())
            }
        };

        let value = match storage.as_deref() {
            None => SourceValue::Null,
            Some("INTEGER") => {
                let v: i64 = row.try_get_unchecked(index)?;
                if declared == "BOOLEAN" {
                    SourceValue::Bool(v != 0)
                } else {
                    SourceValue::Int(v)
                }
            }
            Some("REAL") => SourceValue::Float(row.try_get_unchecked(index)?),
            Some("BLOB") => SourceValue::Bytes(row.try_get_unchecked(index)?),
            Some(_) => {
                let text: String = row.try_get_unchecked(index)?;
                decode_text(&declared, text)
            }
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

/// Text stored in a date/time-declared column is read as a temporal value when it parses.
fn decode_text(declared: &str, text: String) -> SourceValue {
    let temporal_column = matches!(declared, "DATE" | "TIME" | "DATETIME" | "TIMESTAMP");
    if temporal_column {
        if let Some(temporal) = parse_temporal_text(&text) {
            return SourceValue::Temporal(temporal);
        }
    }
    SourceValue::Text(text)
}

fn parse_temporal_text(text: &str) -> Option<Temporal> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Temporal::OffsetDateTime(dt));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Temporal::DateTime(dt));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Temporal::Date(date));
    }
    if let Ok(time) = NaiveTime::parse_from_str(text, "%H:%M:%S%.f") {
        return Some(Temporal::Time(time));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_decode_text_in_temporal_columns() {
        assert!(matches!(
            decode_text("DATETIME", "2024-01-02 03:04:05".to_string()),
            SourceValue::Temporal(Temporal::DateTime(_))
        ));
        assert!(matches!(
            decode_text("DATE", "2024-01-02".to_string()),
            SourceValue::Temporal(Temporal::Date(_))
        ));
        assert!(matches!(
            decode_text("DATETIME", "2024-01-02T03:04:05Z".to_string()),
            SourceValue::Temporal(Temporal::OffsetDateTime(_))
        ));
        // unparsable text stays text
        assert_eq!(
            decode_text("DATETIME", "soon".to_string()),
            SourceValue::Text("soon".to_string())
        );
        // text columns are never reinterpreted
        assert_eq!(
            decode_text("TEXT", "2024-01-02".to_string()),
            SourceValue::Text("2024-01-02".to_string())
        );
    }
}
