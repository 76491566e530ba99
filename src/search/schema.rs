//! Index document model / 索引文档模型

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};

/// Normalized column value / 规范化后的列值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Text used for full-text matching; `None` for null / 用于全文匹配的文本
    pub fn as_content(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::Text(s) => Some(s.clone()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Column name → value pairs in source column order / 有序字段映射
///
/// Serialized as a JSON object whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(Vec<(String, FieldValue)>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.push((column.into(), value.into()));
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldMapVisitor;

        impl<'de> Visitor<'de> for FieldMapVisitor {
            type Value = FieldMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object of column values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldMap, A::Error> {
                let mut fields = FieldMap::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, FieldValue>()? {
                    fields.push(name, value);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldMapVisitor)
    }
}

/// Creation timestamp of a row / 行创建时间
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAt {
    /// Canonical string of the source value
    pub raw: String,
    pub epoch_ms: i64,
}

/// One searchable source row / 行文档
#[derive(Debug, Clone, PartialEq)]
pub struct RowDocument {
    pub table: String,
    /// Primary-key values joined with ':'
    pub id: String,
    pub fields: FieldMap,
    pub content: String,
    pub created_at: Option<CreatedAt>,
}

/// Per-table metadata recorded after the table's rows / 表摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub table: String,
    #[serde(rename = "primary_key")]
    pub primary_key_columns: Vec<String>,
    pub row_count: u64,
    pub has_created_at: bool,
}

/// Everything written to the store / 写入索引的文档
#[derive(Debug, Clone, PartialEq)]
pub enum IndexDocument {
    Row(RowDocument),
    Table(TableSummary),
}

/// Clamp a requested page size into `[1, MAX_SEARCH_LIMIT]` / 限制返回条数
pub fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        None => DEFAULT_SEARCH_LIMIT,
        Some(n) => n.clamp(1, MAX_SEARCH_LIMIT as i64) as usize,
    }
}

/// Search query options / 搜索查询选项
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Query text in the store's grammar; blank matches everything
    pub query: Option<String>,
    /// Exact table name filter / 表名过滤
    pub table: Option<String>,
    /// Inclusive lower bound on created_at (epoch ms)
    pub created_from: Option<i64>,
    /// Inclusive upper bound on created_at (epoch ms)
    pub created_to: Option<i64>,
    pub limit: Option<i64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_created_range(mut self, from: Option<i64>, to: Option<i64>) -> Self {
        self.created_from = from;
        self.created_to = to;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query text when it has any non-blank content
    pub fn query_text(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn table_filter(&self) -> Option<&str> {
        self.table.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn has_range(&self) -> bool {
        self.created_from.is_some() || self.created_to.is_some()
    }

    pub fn effective_limit(&self) -> usize {
        clamp_limit(self.limit)
    }
}

/// A hydrated row / 搜索结果行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRow {
    pub table: String,
    pub id: String,
    pub created_at: Option<String>,
    pub fields: FieldMap,
}

/// One page of search results / 搜索结果页
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    /// Query text as given, empty when absent
    pub query: String,
    pub table: Option<String>,
    /// All matching documents, not just this page
    pub count: usize,
    pub limit: usize,
    pub results: Vec<SearchRow>,
}

/// Why a table contributed no documents / 跳过或失败的表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIssue {
    pub table: String,
    pub reason: String,
}

/// Outcome of one full ingestion pass / 一次完整索引构建的结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    pub tables_indexed: usize,
    pub rows_indexed: u64,
    pub rows_skipped: u64,
    pub skipped_tables: Vec<TableIssue>,
    pub failed_tables: Vec<TableIssue>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_map_keeps_column_order() {
        let fields = FieldMap::new()
            .with("zeta", 1i64)
            .with("alpha", "a")
            .with("mid", FieldValue::Null)
            .with("flag", true)
            .with("ratio", FieldValue::Float(0.5));

        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":"a","mid":null,"flag":true,"ratio":0.5}"#);

        let back: FieldMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fields);
        let names: Vec<&str> = back.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid", "flag", "ratio"]);
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(10_000)), 500);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(-5)), 1);
        assert_eq!(clamp_limit(Some(20)), 20);
    }

    #[test]
    fn test_blank_query_and_table_are_absent() {
        let request = SearchRequest::new("   ").with_table(" ");
        assert_eq!(request.query_text(), None);
        assert_eq!(request.table_filter(), None);
        assert!(!request.has_range());
    }

    #[test]
    fn test_table_filter_is_trimmed() {
        let request = SearchRequest::match_all().with_table(" users ");
        assert_eq!(request.table_filter(), Some("users"));
    }

    #[test]
    fn test_table_summary_json() {
        let summary = TableSummary {
            table: "users".to_string(),
            primary_key_columns: vec!["id".to_string()],
            row_count: 2,
            has_created_at: true,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["primary_key"][0], "id");
        assert_eq!(json["row_count"], 2);
    }
}
