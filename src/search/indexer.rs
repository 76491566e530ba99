//! Index builder - full ingestion pass / 索引构建器
//!
//! Architecture principles / 架构原则：
//! - One pass reads every table and writes a brand new store
//! - Tables are processed sequentially; rows stream through a bounded window
//! - A failing table is dropped from the pass, the others still land
//! - The previous store stays live until the new one is committed and promoted

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tantivy::{Index, IndexWriter, Term};

use super::fields::{build_schema, IndexFields};
use super::materializer::{is_created_at, materialize};
use super::schema::{BuildReport, IndexDocument, TableIssue, TableSummary};
use super::store::StagingStore;
use super::tokenizer::register_tokenizers;
use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::source::{self, SourceDatabase, DEFAULT_FETCH_SIZE};
use crate::state::IndexState;

/// Default indexing memory budget shared by the writer threads / 默认写入内存
pub const DEFAULT_WRITER_HEAP_BYTES: usize = 50_000_000;

/// What happened to one table / 单表处理结果
enum TableOutcome {
    Indexed { rows: u64, skipped_rows: u64 },
    Skipped(String),
}

/// Builds a complete store from a source database / 索引构建器
#[derive(Clone)]
pub struct IndexBuilder {
    fetch_size: usize,
    writer_heap_bytes: usize,
    progress: Option<Arc<IndexState>>,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self {
            fetch_size: DEFAULT_FETCH_SIZE,
            writer_heap_bytes: DEFAULT_WRITER_HEAP_BYTES,
            progress: None,
        }
    }

    /// Builder tuned by the `index` config section / 按配置创建
    pub fn from_config(config: &IndexConfig) -> Self {
        Self::new()
            .with_fetch_size(config.fetch_size)
            .with_writer_heap(config.writer_heap_bytes)
    }

    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size.max(1);
        self
    }

    pub fn with_writer_heap(mut self, bytes: usize) -> Self {
        self.writer_heap_bytes = bytes;
        self
    }

    /// Report row and table counts into `state` while building / 进度上报
    pub fn with_progress(mut self, state: Arc<IndexState>) -> Self {
        self.progress = Some(state);
        self
    }

    /// Connect to `url` and build / 连接数据源并构建
    ///
    /// A connection failure returns before anything on disk is touched.
    pub async fn build_from_url(&self, url: &str, destination: &Path) -> Result<BuildReport> {
        let source = source::connect(url).await?;
        let result = self.build(source.as_ref(), destination).await;
        source.close().await;
        result
    }

    /// Run a full pass and replace the store at `destination` / 全量构建并替换索引
    pub async fn build(
        &self,
        source: &dyn SourceDatabase,
        destination: &Path,
    ) -> Result<BuildReport> {
        let started = Instant::now();
        let staging = StagingStore::create(destination)?;

        match self.build_into(source, staging.path()).await {
            Ok(mut report) => {
                staging.promote()?;
                report.duration_ms = started.elapsed().as_millis() as u64;
                tracing::info!(
                    "Index build finished: {} tables, {} rows, {} skipped tables, {} failed tables in {}ms",
                    report.tables_indexed,
                    report.rows_indexed,
                    report.skipped_tables.len(),
                    report.failed_tables.len(),
                    report.duration_ms
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Index build failed, previous store kept: {}", e);
                staging.discard();
                Err(e)
            }
        }
    }

    async fn build_into(&self, source: &dyn SourceDatabase, path: &Path) -> Result<BuildReport> {
        let index = Index::create_in_dir(path, build_schema())?;
        register_tokenizers(&index);
        let fields = IndexFields::load(&index.schema())?;
        // one indexing thread keeps documents in insertion order
        let writer: IndexWriter = index.writer_with_num_threads(1, self.writer_heap_bytes)?;

        let tables = source.list_tables().await?;
        tracing::info!("Found {} tables in {} source", tables.len(), source.name());

        let mut report = BuildReport::default();
        for table in tables {
            if let Some(state) = &self.progress {
                state.begin_table(&table);
            }

            match self.index_table(source, &writer, &fields, &table).await {
                Ok(TableOutcome::Indexed { rows, skipped_rows }) => {
                    tracing::info!("Indexed table {} (rows: {})", table, rows);
                    report.tables_indexed += 1;
                    report.rows_indexed += rows;
                    report.rows_skipped += skipped_rows;
                    if let Some(state) = &self.progress {
                        state.table_done();
                    }
                }
                Ok(TableOutcome::Skipped(reason)) => {
                    tracing::warn!("Skipping table {}: {}", table, reason);
                    report.skipped_tables.push(TableIssue { table, reason });
                }
                Err(e) => {
                    // drop whatever this table already queued
                    writer.delete_term(Term::from_field_text(fields.table, &table));
                    tracing::warn!("Failed to index table {}: {}", table, e);
                    report.failed_tables.push(TableIssue {
                        table,
                        reason: e.to_string(),
                    });
                }
            }
        }

        commit(writer).await?;
        Ok(report)
    }

    async fn index_table(
        &self,
        source: &dyn SourceDatabase,
        writer: &IndexWriter,
        fields: &IndexFields,
        table: &str,
    ) -> Result<TableOutcome> {
        let primary_keys = source.primary_key_columns(table).await?;
        if primary_keys.is_empty() {
            return Ok(TableOutcome::Skipped("no primary key".to_string()));
        }

        let columns = source.columns(table).await?;
        let mut has_created_at = columns.iter().any(|c| is_created_at(c));

        let mut rows = source.stream_rows(table, self.fetch_size);
        let mut row_count = 0u64;
        let mut skipped_rows = 0u64;

        while let Some(row) = rows.next().await {
            let row = row?;
            if columns.is_empty() && !has_created_at {
                has_created_at = row.columns().any(is_created_at);
            }
            match materialize(table, &columns, &row, &primary_keys) {
                Some(doc) => {
                    writer.add_document(fields.to_document(&IndexDocument::Row(doc))?)?;
                    row_count += 1;
                    if let Some(state) = &self.progress {
                        state.increment();
                    }
                }
                None => {
                    skipped_rows += 1;
                    tracing::debug!("Skipping row of {} with null primary key", table);
                }
            }
        }

        let summary = TableSummary {
            table: table.to_string(),
            primary_key_columns: primary_keys,
            row_count,
            has_created_at,
        };
        writer.add_document(fields.to_document(&IndexDocument::Table(summary))?)?;

        Ok(TableOutcome::Indexed {
            rows: row_count,
            skipped_rows,
        })
    }
}

/// Commit once and wait for merges, off the async runtime / 提交并等待合并
async fn commit(mut writer: IndexWriter) -> Result<()> {
    tokio::task::spawn_blocking(move || -> Result<()> {
        writer.commit()?;
        writer.wait_merging_threads()?;
        Ok(())
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}
