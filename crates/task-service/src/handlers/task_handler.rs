//! Task endpoints. Every handler requires an authenticated [`Identity`].

use super::auth_handler::parse_json;
use crate::auth::Identity;
use crate::errors::TaskError;
use crate::models::{
    ApiResponse, TaskCreateRequest, TaskPageResponse, TaskResponse, TaskSearchRequest,
};
use crate::routes::AppState;
use crate::services::task_service;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

fn parse_task_id(raw: &str) -> Result<i64, TaskError> {
    raw.parse::<i64>()
        .map_err(|_| TaskError::BadRequest(format!("Invalid task ID: {}", raw)))
}

/// `POST /api/v1/tasks`
#[instrument(skip_all, name = "task.tasks.create")]
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<TaskResponse>>), TaskError> {
    let request: TaskCreateRequest = parse_json(&body)?;
    let task = task_service::create_task(state.tasks.as_ref(), &identity, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(task, "Task created successfully")),
    ))
}

/// `GET /api/v1/tasks`
#[instrument(skip_all, name = "task.tasks.list")]
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    uri: Uri,
) -> Result<Json<ApiResponse<TaskPageResponse>>, TaskError> {
    let Query(search) = Query::<TaskSearchRequest>::try_from_uri(&uri).map_err(|e| {
        tracing::debug!(target: "task.handlers.tasks", error = %e, "Invalid query string");
        TaskError::BadRequest("Invalid query parameters".to_string())
    })?;

    let page = task_service::list_tasks(state.tasks.as_ref(), &identity, search).await?;

    Ok(Json(ApiResponse::success(
        page,
        "Tasks retrieved successfully",
    )))
}

/// `GET /api/v1/tasks/:id`
#[instrument(skip_all, name = "task.tasks.get")]
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TaskResponse>>, TaskError> {
    let id = parse_task_id(&id)?;
    let task = task_service::get_task(state.tasks.as_ref(), &identity, id).await?;

    Ok(Json(ApiResponse::success(task, "Task retrieved successfully")))
}

/// `PUT /api/v1/tasks/:id` - marks the task done.
#[instrument(skip_all, name = "task.tasks.complete")]
pub async fn complete_task(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TaskResponse>>, TaskError> {
    let id = parse_task_id(&id)?;
    let task = task_service::complete_task(state.tasks.as_ref(), &identity, id).await?;

    Ok(Json(ApiResponse::success(task, "Task updated successfully")))
}

/// `DELETE /api/v1/tasks/:id`
#[instrument(skip_all, name = "task.tasks.delete")]
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, TaskError> {
    let id = parse_task_id(&id)?;
    task_service::delete_task(state.tasks.as_ref(), &identity, id).await?;

    Ok(Json(ApiResponse::empty("Task deleted successfully")))
}
