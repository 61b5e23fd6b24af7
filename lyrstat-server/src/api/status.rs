//! Task status polling

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use super::method_not_allowed;
use crate::tasks::TaskStatus;
use crate::{ApiError, ApiResult, AppState};

/// GET /api/status/:task_id
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<TaskStatus>> {
    let task_id = task_id.trim();
    if task_id.is_empty() {
        return Err(missing_task_id());
    }

    state
        .runner
        .registry()
        .get(task_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("task not found".to_string()))
}

/// GET /api/status/ with an empty id segment
async fn empty_task_id() -> ApiError {
    missing_task_id()
}

fn missing_task_id() -> ApiError {
    ApiError::BadRequest("task id required".to_string())
}

pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/status/:task_id",
            get(get_status).fallback(method_not_allowed),
        )
        .route("/api/status/", get(empty_task_id).fallback(method_not_allowed))
        .route("/api/status", get(empty_task_id).fallback(method_not_allowed))
}
