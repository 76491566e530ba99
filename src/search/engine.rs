//! Query engine - read-only access to a committed store / 查询引擎
//!
//! Architecture principle: only expose primitive operations / 架构原则
//! - list_tables: table summaries / 表摘要
//! - search: filtered full-text search / 过滤+全文搜索
//! - lookup: point lookup by table and id / 按主键查询
//!
//! The engine never writes. A rebuilt store is observed by opening a new engine.

use std::ops::Bound;
use std::path::Path;

use tantivy::collector::{Count, TopDocs};
use tantivy::query::{
    AllQuery, BooleanQuery, ConstScoreQuery, Occur, Query, QueryParser, RangeQuery, TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::{DocAddress, Index, IndexReader, ReloadPolicy, Searcher, Term};

use super::fields::{IndexFields, DOC_TYPE_ROW, DOC_TYPE_TABLE, F_CREATED_AT_EPOCH};
use super::grammar::rewrite_and_not;
use super::schema::{SearchPage, SearchRequest, SearchRow, TableSummary};
use super::tokenizer::register_tokenizers;
use super::MAX_TABLES;
use crate::error::Result;

/// Search engine over one committed store / 查询引擎
pub struct QueryEngine {
    index: Index,
    reader: IndexReader,
    fields: IndexFields,
}

impl QueryEngine {
    /// Open a committed store for reading / 打开已提交的索引
    pub fn open(path: &Path) -> Result<Self> {
        let index = Index::open_in_dir(path)?;
        register_tokenizers(&index);
        let fields = IndexFields::load(&index.schema())?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        tracing::info!("Opened index store at {}", path.display());
        Ok(Self {
            index,
            reader,
            fields,
        })
    }

    /// Total documents of both kinds / 文档总数
    pub fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Summaries of the indexed tables, in store order / 列出已索引的表
    pub fn list_tables(&self) -> Result<Vec<TableSummary>> {
        let searcher = self.reader.searcher();
        let query = self.term_query(self.fields.doc_type, DOC_TYPE_TABLE);

        let mut addresses: Vec<DocAddress> = searcher
            .search(&query, &TopDocs::with_limit(MAX_TABLES))?
            .into_iter()
            .map(|(_, address)| address)
            .collect();
        addresses.sort();

        let mut tables = Vec::with_capacity(addresses.len());
        for address in addresses {
            let doc = searcher.doc(address)?;
            tables.push(self.fields.to_table_summary(&doc));
        }
        Ok(tables)
    }

    /// Filtered search over row documents / 搜索行文档
    ///
    /// Only the query text contributes to the score; table and time filters
    /// narrow the result set without reordering it.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        let limit = request.effective_limit();
        let query = self.compose(request)?;
        let searcher = self.reader.searcher();

        let (top, count) = searcher.search(&query, &(TopDocs::with_limit(limit), Count))?;
        let results = self.hydrate(&searcher, top.into_iter().map(|(_, address)| address))?;

        tracing::debug!(
            "Search {:?} (table {:?}) matched {} rows, returning {}",
            request.query_text(),
            request.table_filter(),
            count,
            results.len()
        );

        Ok(SearchPage {
            query: request.query.clone().unwrap_or_default(),
            table: request.table.clone(),
            count,
            limit,
            results,
        })
    }

    /// Fetch one row by table and id / 按表名和ID查询
    pub fn lookup(&self, table: &str, id: &str) -> Result<Option<SearchRow>> {
        if table.trim().is_empty() || id.trim().is_empty() {
            return Ok(None);
        }

        let query = BooleanQuery::new(vec![
            (Occur::Must, self.term_query(self.fields.doc_type, DOC_TYPE_ROW)),
            (Occur::Must, self.term_query(self.fields.table, table)),
            (Occur::Must, self.term_query(self.fields.id, id)),
        ]);

        let searcher = self.reader.searcher();
        let top = searcher.search(&query, &TopDocs::with_limit(1))?;
        let mut rows = self.hydrate(&searcher, top.into_iter().map(|(_, address)| address))?;
        Ok(rows.pop())
    }

    fn compose(&self, request: &SearchRequest) -> Result<BooleanQuery> {
        let scoring: Box<dyn Query> = match request.query_text() {
            Some(text) => {
                let parser = QueryParser::for_index(&self.index, vec![self.fields.content]);
                parser.parse_query(&rewrite_and_not(text))?
            }
            None => Box::new(AllQuery),
        };

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![
            (Occur::Must, scoring),
            (Occur::Must, filter(self.term_query(self.fields.doc_type, DOC_TYPE_ROW))),
        ];

        if let Some(table) = request.table_filter() {
            clauses.push((Occur::Must, filter(self.term_query(self.fields.table, table))));
        }

        if request.has_range() {
            let lower = request.created_from.map_or(Bound::Unbounded, Bound::Included);
            let upper = request.created_to.map_or(Bound::Unbounded, Bound::Included);
            let range = RangeQuery::new_i64_bounds(F_CREATED_AT_EPOCH.to_string(), lower, upper);
            clauses.push((Occur::Must, filter(Box::new(range))));
        }

        Ok(BooleanQuery::new(clauses))
    }

    fn hydrate(
        &self,
        searcher: &Searcher,
        addresses: impl Iterator<Item = DocAddress>,
    ) -> Result<Vec<SearchRow>> {
        let mut rows = Vec::new();
        for address in addresses {
            let doc = searcher.doc(address)?;
            rows.push(self.fields.to_search_row(&doc)?);
        }
        Ok(rows)
    }

    fn term_query(&self, field: Field, value: &str) -> Box<dyn Query> {
        Box::new(TermQuery::new(
            Term::from_field_text(field, value),
            IndexRecordOption::Basic,
        ))
    }
}

/// Match like `query` but contribute no score / 仅过滤不计分
fn filter(query: Box<dyn Query>) -> Box<dyn Query> {
    Box::new(ConstScoreQuery::new(query, 0.0))
}
