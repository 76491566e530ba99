use axum::{extract::State, Json};
use std::sync::Arc;

use super::types::IndexStatus;
use crate::api::{ApiError, ApiResponse};
use crate::error::{self, Error};
use crate::search::{BuildReport, IndexBuilder, QueryEngine};
use crate::state::AppState;

/// POST /admin/index/rebuild - 后台重建索引
pub async fn rebuild_index(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    if state.source_url.is_none() {
        return Ok(Json(ApiResponse::error("Source database is not configured")));
    }

    if !state.index_state.try_start() {
        return Ok(Json(ApiResponse {
            code: 409,
            message: "Index rebuild already running".to_string(),
            data: None,
        }));
    }

    tokio::spawn(async move {
        match run_rebuild(&state).await {
            Ok(report) => {
                tracing::info!("Rebuild finished ({} rows)", report.rows_indexed);
                state.index_state.finish(None);
            }
            Err(e) => {
                tracing::error!("Rebuild failed: {}", e);
                state.index_state.finish(Some(e.to_string()));
            }
        }
    });

    Ok(Json(ApiResponse::success(())))
}

/// Build into the configured store and publish the new engine / 构建并切换查询引擎
///
/// The caller owns the running flag of `state.index_state`.
pub async fn run_rebuild(state: &AppState) -> error::Result<BuildReport> {
    let url = state
        .source_url
        .as_deref()
        .ok_or_else(|| Error::Config("source database is not configured".to_string()))?;
    let path = state.config.index_path();

    let report = IndexBuilder::from_config(&state.config.index)
        .with_progress(state.index_state.clone())
        .build_from_url(url, &path)
        .await?;

    let engine = QueryEngine::open(&path)?;
    state.replace_engine(engine);
    Ok(report)
}

/// GET /admin/index/status - 索引状态
pub async fn get_index_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<IndexStatus>>, ApiError> {
    let progress = state.index_state.get_progress();

    let status = if progress.is_running {
        "indexing"
    } else if progress.error.is_some() {
        "error"
    } else {
        "idle"
    };

    let last_done_time = progress.last_done_time.map(|ts| {
        chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default()
    });

    let index_status = IndexStatus {
        status: status.to_string(),
        running: progress.is_running,
        rows_indexed: progress.rows_indexed,
        tables_indexed: progress.tables_indexed,
        current_table: progress.current_table,
        documents: state.engine().doc_count(),
        error: progress.error,
        last_done_time,
    };
    Ok(Json(ApiResponse::success(index_status)))
}
