//! Cache Status Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::infrastructure::http::dto::{
    ApiResponse, DeleteEntryRequest, DeleteEntryResponse, StatusResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 引擎统计 + 队列快照
pub async fn cache_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatusResponse>> {
    Json(ApiResponse::success(StatusResponse {
        stats: state.engine.stats(),
        queue: state.engine.get_queue(),
        clients: state.broker.client_count(),
    }))
}

/// 删除一个已缓存的音频
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteEntryRequest>,
) -> Result<Json<ApiResponse<DeleteEntryResponse>>, ApiError> {
    if req.path.is_empty() {
        return Err(ApiError::BadRequest("path is required".to_string()));
    }

    if state.engine.entry_state(&req.path).map(|s| s.is_pending()).unwrap_or(false) {
        return Err(ApiError::Conflict(format!("{} is being downloaded", req.path)));
    }

    let deleted = state.engine.delete(&req.path).await?;
    Ok(Json(ApiResponse::success(DeleteEntryResponse {
        path: req.path,
        deleted,
    })))
}
