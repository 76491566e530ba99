use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::search::{parse_epoch_millis, SearchRequest};

/// 搜索请求参数 (GET /search)
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    /// Short alias of `query`
    pub q: Option<String>,
    pub table: Option<String>,
    pub created_at_from: Option<String>,
    pub created_at_to: Option<String>,
    /// Kept as text so a non-numeric value falls back to the default
    pub limit: Option<String>,
}

impl SearchParams {
    /// Bounds that fail to parse are dropped rather than rejected.
    pub fn into_request(self) -> SearchRequest {
        let query = self
            .query
            .filter(|q| !q.trim().is_empty())
            .or(self.q)
            .filter(|q| !q.trim().is_empty());

        SearchRequest {
            query,
            table: self
                .table
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            created_from: self.created_at_from.as_deref().and_then(parse_epoch_millis),
            created_to: self.created_at_to.as_deref().and_then(parse_epoch_millis),
            limit: self.limit.as_deref().and_then(|l| l.trim().parse::<i64>().ok()),
        }
    }
}

/// 每张表对应的工具描述
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub table: String,
    pub search_tool: ToolSpec,
    pub lookup_tool: ToolSpec,
    pub endpoints: ToolEndpoints,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolEndpoints {
    pub search: String,
    pub lookup: String,
}

impl ToolDescriptor {
    pub fn for_table(table: &str) -> Self {
        let name = tool_name(table);
        Self {
            table: table.to_string(),
            search_tool: ToolSpec {
                name: format!("search_{}", name),
                description: format!("Search rows in {}", table),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string"},
                        "created_at_from": {"type": "string"},
                        "created_at_to": {"type": "string"},
                        "limit": {"type": "integer"}
                    },
                    "additionalProperties": false
                }),
            },
            lookup_tool: ToolSpec {
                name: format!("get_{}_by_id", name),
                description: format!("Lookup a {} row by id", table),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"}
                    },
                    "additionalProperties": false
                }),
            },
            endpoints: ToolEndpoints {
                search: format!("/search?table={}", urlencoding::encode(table)),
                lookup: format!("/{}/{{id}}", urlencoding::encode(table)),
            },
        }
    }
}

/// 工具名：表名去空白并转小写
pub fn tool_name(table: &str) -> String {
    table.trim().to_lowercase()
}

/// 索引状态
#[derive(Debug, Serialize)]
pub struct IndexStatus {
    pub status: String,
    pub running: bool,
    pub rows_indexed: u64,
    pub tables_indexed: u64,
    pub current_table: Option<String>,
    pub documents: u64,
    pub error: Option<String>,
    pub last_done_time: Option<String>,
}
