use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use super::types::{SearchParams, ToolDescriptor};
use crate::api::{api_error, ApiError};
use crate::search::{SearchPage, SearchRow};
use crate::state::AppState;

/// GET /tables - 列出已索引的表
pub async fn list_tables(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let tables = state.engine().list_tables().map_err(|e| {
        tracing::error!("Failed to list tables: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list tables", e)
    })?;

    Ok(Json(json!({ "tables": tables })))
}

/// GET /tools - 每张表的搜索/查询工具描述
pub async fn list_tools(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let tables = state.engine().list_tables().map_err(|e| {
        tracing::error!("Failed to list tools: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list tools", e)
    })?;

    let tools: Vec<ToolDescriptor> = tables
        .iter()
        .map(|summary| ToolDescriptor::for_table(&summary.table))
        .collect();

    Ok(Json(json!({ "tools": tools })))
}

/// GET /search - 全文搜索
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchPage>, ApiError> {
    let request = params.into_request();
    tracing::debug!(
        "Search query={:?} table={:?} range={:?}..{:?}",
        request.query,
        request.table,
        request.created_from,
        request.created_to
    );

    let engine = state.engine();
    match engine.search(&request) {
        Ok(page) => Ok(Json(page)),
        Err(e) if e.is_query_error() => {
            Err(api_error(StatusCode::BAD_REQUEST, "Search failed", e))
        }
        Err(e) => {
            tracing::error!("Search failed: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Search failed", e))
        }
    }
}

/// GET /:table/:id - 按主键查询单行
pub async fn lookup_row(
    State(state): State<Arc<AppState>>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<SearchRow>, ApiError> {
    let row = state.engine().lookup(&table, &id).map_err(|e| {
        tracing::error!("Lookup {}/{} failed: {}", table, id, e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Lookup failed", e)
    })?;

    row.map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))))
}
