//! MySQL / MariaDB source adapter / MySQL 数据源
//!
//! Schema discovery goes through `information_schema`, restricted to the
//! database selected by the connection URL. Values are decoded by the column's
//! reported type name.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::StreamExt;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use async_trait::async_trait;

use super::{forward_rows, redact_url, row_channel, RowStream, SourceDatabase, SourceRow, SourceValue, Temporal};
use crate::error::{Error, Result};

pub struct MySqlSource {
    pool: MySqlPool,
}

impl MySqlSource {
    /// Connect to a MySQL server / 连接MySQL
    pub async fn connect(url: &str) -> Result<Self> {
        // mariadb:// is accepted as an alias
        let url = match url.strip_prefix("mariadb:") {
            Some(rest) => format!("mysql:{}", rest),
            None => url.to_string(),
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await?;

        tracing::info!("Connected to MySQL source: {}", redact_url(&url));
        Ok(Self { pool })
    }

    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Base tables of the connected schema, in metadata order
const LIST_TABLES_SQL: &str = r#"SELECT CAST(TABLE_NAME AS CHAR)
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'"#;

#[async_trait]
impl SourceDatabase for MySqlSource {
    fn name(&self) -> &str {
        "mysql"
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(LIST_TABLES_SQL)
            .fetch_all(&self.pool)
            .await?;

        Ok(names.into_iter().filter(|n| !n.trim().is_empty()).collect())
    }

    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        let keys: Vec<String> = sqlx::query_scalar(
            r#"SELECT CAST(COLUMN_NAME AS CHAR)
               FROM information_schema.KEY_COLUMN_USAGE
               WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY'
               ORDER BY ORDINAL_POSITION"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys.into_iter().filter(|k| !k.trim().is_empty()).collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>> {
        let columns: Vec<String> = sqlx::query_scalar(
            r#"SELECT CAST(COLUMN_NAME AS CHAR)
               FROM information_schema.COLUMNS
               WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
               ORDER BY ORDINAL_POSITION"#,
        )
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
    format!("`{}`", name.replace('`', "``"))
}

/// How a MySQL column type is read / 列类型对应的解码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoding {
    Bool,
    Signed,
    Unsigned,
    Float,
    Double,
    Date,
    Time,
    DateTime,
    Timestamp,
    Binary,
    Text,
}

fn decoding_for(type_name: &str) -> Decoding {
    let name = type_name.to_ascii_uppercase();
    if name.ends_with(" UNSIGNED") {
        return Decoding::Unsigned;
    }
    match name.as_str() {
        "BOOLEAN" => Decoding::Bool,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => Decoding::Signed,
        "FLOAT" => Decoding::Float,
        "DOUBLE" => Decoding::Double,
        "DATE" => Decoding::Date,
        "TIME" => Decoding::Time,
        "DATETIME" => Decoding::DateTime,
        "TIMESTAMP" => Decoding::Timestamp,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => Decoding::Binary,
        // DECIMAL, CHAR, VARCHAR, TEXT, JSON, ENUM, SET
        _ => Decoding::Text,
    }
}

fn decode_row(row: &MySqlRow) -> Result<SourceRow> {
    let mut out = SourceRow::with_capacity(row.len());
    for column in row.columns() {
        let index = column.ordinal();
        let type_name = column.type_info().name();

        let value = if row.try_get_raw(index)?.is_null() {
            SourceValue::Null
        } else {
            decode_value(row, index, type_name)?
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

fn decode_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<SourceValue> {
    let value = match decoding_for(type_name) {
        Decoding::Bool => SourceValue::Bool(row.try_get_unchecked::<i64, _>(index)? != 0),
        Decoding::Signed => SourceValue::Int(row.try_get_unchecked(index)?),
        Decoding::Unsigned => {
            let v: u64 = row.try_get_unchecked(index)?;
            match i64::try_from(v) {
                Ok(v) => SourceValue::Int(v),
                Err(_) => SourceValue::Text(v.to_string()),
            }
        }
        Decoding::Float => SourceValue::Float(row.try_get_unchecked::<f32, _>(index)? as f64),
        Decoding::Double => SourceValue::Float(row.try_get_unchecked(index)?),
        Decoding::Date => temporal_or_null(row.try_get::<NaiveDate, _>(index), type_name, Temporal::Date),
        Decoding::Time => temporal_or_null(row.try_get::<NaiveTime, _>(index), type_name, Temporal::Time),
        Decoding::DateTime => {
            temporal_or_null(row.try_get::<NaiveDateTime, _>(index), type_name, Temporal::DateTime)
        }
        Decoding::Timestamp => {
            temporal_or_null(row.try_get::<DateTime<Utc>, _>(index), type_name, Temporal::Instant)
        }
        Decoding::Binary => SourceValue::Bytes(row.try_get_unchecked(index)?),
        Decoding::Text => match row.try_get_unchecked::<String, _>(index) {
            Ok(text) if type_name.eq_ignore_ascii_case("DECIMAL") => SourceValue::Decimal(text),
            Ok(text) => SourceValue::Text(text),
            // not valid UTF-8
            Err(_) => SourceValue::Bytes(row.try_get_unchecked(index)?),
        },
    };
    Ok(value)
}

/// Zero dates and TIME values outside a day cannot be represented; they index as absent.
fn temporal_or_null<T>(
    decoded: std::result::Result<T, sqlx::Error>,
    type_name: &str,
    wrap: impl FnOnce(T) -> Temporal,
) -> SourceValue {
    match decoded {
        Ok(value) => SourceValue::Temporal(wrap(value)),
        Err(e) => {
            tracing::debug!("Unrepresentable {} value treated as null: {}", type_name, e);
            SourceValue::Null
        }
    }
}
