//! Error types / 错误类型
//!
//! One enum for the whole core. The serving layer maps `Query` to a client
//! error and everything else to a server error.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Source database error: {0}")]
    Source(#[from] sqlx::Error),

    #[error("Index store error: {0}")]
    Store(#[from] tantivy::TantivyError),

    #[error("Invalid search query: {0}")]
    Query(#[from] tantivy::query::QueryParserError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported source database url: {0}")]
    UnsupportedSource(String),
}

impl Error {
    /// Whether the error was caused by the caller's query text / 是否为查询语法错误
    pub fn is_query_error(&self) -> bool {
        matches!(self, Error::Query(_))
    }
}
