//! Source database access - schema discovery and table scans / 源数据库访问
//!
//! Architecture principles / 架构原则：
//! - Adapters only expose primitives: list tables, list keys, list columns, scan
//! - The index builder controls flow, skipping and error recovery
//! - Call direction: Builder → Source (unidirectional) / 调用方向
//!
//! Supported databases / 支持的数据库：
//! - MySQL / MariaDB (`mysql://...`)
//! - SQLite (`sqlite:...`)

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use futures::{Stream, StreamExt};

use crate::error::{Error, Result};

pub mod mysql;
pub mod sqlite;
pub mod value;

pub use mysql::MySqlSource;
pub use sqlite::SqliteSource;
pub use value::{SourceRow, SourceValue, Temporal};

/// Rows of one table scan, in cursor order / 表扫描产生的行流
pub type RowStream = BoxStream<'static, Result<SourceRow>>;

/// Default number of rows buffered ahead of the indexer / 默认预取行数
pub const DEFAULT_FETCH_SIZE: usize = 500;

/// Source database interface (provides only primitive operations) / 源数据库接口
#[async_trait]
pub trait SourceDatabase: Send + Sync {
    /// Dialect name, used in logs / 数据库类型名称
    fn name(&self) -> &str;

    /// Base tables of the connected schema, in metadata order / 列出所有表
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Primary-key columns in declared key order (empty if none) / 主键列
    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>>;

    /// All columns in declaration order / 所有列
    async fn columns(&self, table: &str) -> Result<Vec<String>>;

    /// Full unconditional scan with at most `fetch_size` rows buffered / 全表流式扫描
    fn stream_rows(&self, table: &str, fetch_size: usize) -> RowStream;

    /// Close the underlying pool / 关闭连接池
    async fn close(&self) {}
}

/// Connect to the source named by `url`, choosing the adapter by scheme / 按URL协议连接
pub async fn connect(url: &str) -> Result<Box<dyn SourceDatabase>> {
    let url = url.trim();
    if url.starts_with("mysql:") || url.starts_with("mariadb:") {
        let source = MySqlSource::connect(url).await?;
        return Ok(Box::new(source));
    }
    if url.starts_with("sqlite:") {
        let source = SqliteSource::connect(url).await?;
        return Ok(Box::new(source));
    }
    Err(Error::UnsupportedSource(redact_url(url)))
}

/// Sending half of a scan's prefetch window
pub(crate) type RowSender = mpsc::Sender<Result<SourceRow>>;

/// A bounded channel of `fetch_size` slots and the stream reading from it / 有界预取通道
///
/// The database cursor keeps reading while the indexer works, but never more
/// than `fetch_size` rows ahead.
pub(crate) fn row_channel(fetch_size: usize) -> (RowSender, RowStream) {
    let (tx, rx) = mpsc::channel(fetch_size.max(1));
    (tx, ReceiverStream::new(rx).boxed())
}

/// Forward rows into the window until the source ends, the reader goes away,
/// or the first error has been delivered.
pub(crate) async fn forward_rows<S>(rows: S, tx: RowSender)
where
    S: Stream<Item = Result<SourceRow>>,
{
    let mut rows = Box::pin(rows);
    while let Some(item) = rows.next().await {
        let failed = item.is_err();
        if tx.send(item).await.is_err() || failed {
            break;
        }
    }
}

/// Drain an owned stream on a background task through a prefetch window.
pub fn prefetch<S>(rows: S, fetch_size: usize) -> RowStream
where
    S: Stream<Item = Result<SourceRow>> + Send + 'static,
{
    let (tx, stream) = row_channel(fetch_size);
    tokio::spawn(forward_rows(rows, tx));
    stream
}

/// Strip credentials before a URL ends up in a log line or error / 隐藏URL中的密码
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
