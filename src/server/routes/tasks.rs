//! Task inspection endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::server::state::AppState;
use crate::server::types::{ErrorResponse, TaskListResponse, TaskSummary};

fn not_found(task_id: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Task not found: {}", task_id),
            code: "TASK_NOT_FOUND".to_string(),
        }),
    )
}

/// GET /api/tasks - List in-flight tasks, oldest first
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<TaskListResponse> {
    let tasks = state.sequencer.list_tasks().await;
    Json(TaskListResponse {
        tasks: tasks.iter().map(TaskSummary::from).collect(),
    })
}

/// GET /api/tasks/:id - One task with its plan and results
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let task = state
        .sequencer
        .get_task(&task_id)
        .await
        .ok_or_else(|| not_found(&task_id))?;

    let body = serde_json::to_value(&task).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to serialize task: {}", e),
                code: "SERIALIZE_FAILED".to_string(),
            }),
        )
    })?;
    Ok(Json(body))
}

/// DELETE /api/tasks/:id - Cancel a task
pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskSummary>, (StatusCode, Json<ErrorResponse>)> {
    let task = state
        .sequencer
        .cancel(&task_id)
        .await
        .ok_or_else(|| not_found(&task_id))?;
    Ok(Json(TaskSummary::from(&task)))
}
