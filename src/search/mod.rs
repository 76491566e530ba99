//! Search module - table rows as a searchable corpus / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - The builder owns a staging store for the length of one pass
//! - The engine reads a committed store and never writes
//! - Source adapters only provide primitives; flow control lives in the builder
//! - Call direction: Builder → Source, API → Engine (unidirectional) / 调用方向
//!
//! Index features / 索引特性：
//! - One row document per source row, one summary document per table
//! - Full-text search over all column values (Latin words + CJK characters)
//! - Exact table filter and inclusive created_at time range

pub mod engine;
pub mod fields;
pub mod grammar;
pub mod indexer;
pub mod materializer;
pub mod schema;
pub mod store;
pub mod temporal;
pub mod tokenizer;

pub use engine::QueryEngine;
pub use indexer::IndexBuilder;
pub use schema::{
    BuildReport, CreatedAt, FieldMap, FieldValue, IndexDocument, RowDocument, SearchPage,
    SearchRequest, SearchRow, TableIssue, TableSummary,
};
pub use store::store_exists;
pub use temporal::parse_epoch_millis;

/// Page size when the caller gives none / 默认返回条数
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Upper bound on one page / 单页最大条数
pub const MAX_SEARCH_LIMIT: usize = 500;

/// Upper bound on listed tables / 最多列出的表数量
pub const MAX_TABLES: usize = 1000;
