pub mod search;
pub mod server;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            code: 400,
            message: message.to_string(),
            data: None,
        }
    }
}

/// Error payload used by every handler / 统一错误响应
pub type ApiError = (StatusCode, Json<Value>);

pub fn api_error(status: StatusCode, error: &str, message: impl ToString) -> ApiError {
    (
        status,
        Json(json!({
            "error": error,
            "message": message.to_string(),
        })),
    )
}

/// All HTTP routes / 路由表
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(server::health_check))
        .route("/tables", get(search::list_tables))
        .route("/tools", get(search::list_tools))
        .route("/search", get(search::search))
        // 索引管理API
        .route("/admin/index/rebuild", post(search::rebuild_index))
        .route("/admin/index/status", get(search::get_index_status))
        .route("/:table/:id", get(search::lookup_row))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
