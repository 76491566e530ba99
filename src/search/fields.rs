//! Store schema and document mapping / 索引字段定义
//!
//! Both document kinds share one schema; `doc_type` tells them apart.

use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED,
    STRING,
};
use tantivy::Document;

use super::schema::{FieldMap, IndexDocument, SearchRow, TableSummary};
use super::tokenizer::CONTENT_TOKENIZER;
use crate::error::{Error, Result};

pub const DOC_TYPE_ROW: &str = "row";
pub const DOC_TYPE_TABLE: &str = "table_meta";

pub const F_DOC_TYPE: &str = "doc_type";
pub const F_TABLE: &str = "table";
pub const F_ID: &str = "id";
pub const F_DATA: &str = "data";
pub const F_CONTENT: &str = "content";
pub const F_CREATED_AT: &str = "created_at";
pub const F_CREATED_AT_EPOCH: &str = "created_at_epoch";
pub const F_PRIMARY_KEY: &str = "primary_key";
pub const F_ROW_COUNT: &str = "row_count";
pub const F_HAS_CREATED_AT: &str = "has_created_at";

pub fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    let content_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(CONTENT_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );

    builder.add_text_field(F_DOC_TYPE, STRING | STORED);
    builder.add_text_field(F_TABLE, STRING | STORED);
    builder.add_text_field(F_ID, STRING | STORED);
    builder.add_text_field(F_DATA, STORED);
    builder.add_text_field(F_CONTENT, content_options);
    builder.add_text_field(F_CREATED_AT, STORED);
    builder.add_i64_field(F_CREATED_AT_EPOCH, INDEXED | STORED | FAST);
    builder.add_text_field(F_PRIMARY_KEY, STORED);
    builder.add_u64_field(F_ROW_COUNT, STORED);
    builder.add_bool_field(F_HAS_CREATED_AT, STORED);

    builder.build()
}

/// Field handles resolved from a store's schema / 字段句柄
#[derive(Debug, Clone, Copy)]
pub struct IndexFields {
    pub doc_type: Field,
    pub table: Field,
    pub id: Field,
    pub data: Field,
    pub content: Field,
    pub created_at: Field,
    pub created_at_epoch: Field,
    pub primary_key: Field,
    pub row_count: Field,
    pub has_created_at: Field,
}

impl IndexFields {
    /// Resolve every field; a store written with another schema is rejected.
    pub fn load(schema: &Schema) -> Result<Self> {
        let get = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| Error::Config(format!("index schema missing field: {}", name)))
        };
        Ok(Self {
            doc_type: get(F_DOC_TYPE)?,
            table: get(F_TABLE)?,
            id: get(F_ID)?,
            data: get(F_DATA)?,
            content: get(F_CONTENT)?,
            created_at: get(F_CREATED_AT)?,
            created_at_epoch: get(F_CREATED_AT_EPOCH)?,
            primary_key: get(F_PRIMARY_KEY)?,
            row_count: get(F_ROW_COUNT)?,
            has_created_at: get(F_HAS_CREATED_AT)?,
        })
    }

    /// Convert a model document into a store document / 转换为索引文档
    pub fn to_document(&self, doc: &IndexDocument) -> Result<Document> {
        let mut out = Document::new();
        match doc {
            IndexDocument::Row(row) => {
                out.add_text(self.doc_type, DOC_TYPE_ROW);
                out.add_text(self.table, &row.table);
                out.add_text(self.id, &row.id);
                out.add_text(self.data, serde_json::to_string(&row.fields)?);
                out.add_text(self.content, &row.content);
                if let Some(created) = &row.created_at {
                    out.add_text(self.created_at, &created.raw);
                    out.add_i64(self.created_at_epoch, created.epoch_ms);
                }
            }
            IndexDocument::Table(summary) => {
                out.add_text(self.doc_type, DOC_TYPE_TABLE);
                out.add_text(self.table, &summary.table);
                for column in &summary.primary_key_columns {
                    out.add_text(self.primary_key, column);
                }
                out.add_u64(self.row_count, summary.row_count);
                out.add_bool(self.has_created_at, summary.has_created_at);
            }
        }
        Ok(out)
    }

    /// Rebuild a result row from a stored row document / 还原结果行
    pub fn to_search_row(&self, doc: &Document) -> Result<SearchRow> {
        let fields = match self.text(doc, self.data) {
            Some(json) => serde_json::from_str::<FieldMap>(json)?,
            None => FieldMap::new(),
        };
        Ok(SearchRow {
            table: self.text(doc, self.table).unwrap_or_default().to_string(),
            id: self.text(doc, self.id).unwrap_or_default().to_string(),
            created_at: self.text(doc, self.created_at).map(str::to_string),
            fields,
        })
    }

    /// Rebuild a table summary from a stored summary document / 还原表摘要
    pub fn to_table_summary(&self, doc: &Document) -> TableSummary {
        TableSummary {
            table: self.text(doc, self.table).unwrap_or_default().to_string(),
            primary_key_columns: doc
                .get_all(self.primary_key)
                .filter_map(|v| v.as_text())
                .map(str::to_string)
                .collect(),
            row_count: doc
                .get_first(self.row_count)
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            has_created_at: doc
                .get_first(self.has_created_at)
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }
    }

    fn text<'a>(&self, doc: &'a Document, field: Field) -> Option<&'a str> {
        doc.get_first(field).and_then(|v| v.as_text())
    }
}
