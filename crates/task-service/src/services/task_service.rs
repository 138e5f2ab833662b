//! Task operations on behalf of an authenticated user.
//!
//! Single-task operations run the same sequence: locate (404), ownership
//! check (403), lifecycle transition (409), persist.

use crate::auth::{ensure_owner, Identity, TaskAction};
use crate::errors::TaskError;
use crate::models::{
    NewTask, Task, TaskCreateRequest, TaskPageResponse, TaskResponse, TaskSearchRequest,
    TaskStatus,
};
use crate::repositories::TaskRepository;
use chrono::Utc;
use tracing::instrument;

fn not_found(id: i64) -> TaskError {
    TaskError::NotFound(format!("Task not found with ID: {}", id))
}

async fn find_owned(
    tasks: &dyn TaskRepository,
    identity: &Identity,
    id: i64,
    action: TaskAction,
) -> Result<Task, TaskError> {
    let task = tasks.find_task(id).await?.ok_or_else(|| not_found(id))?;
    ensure_owner(task.owner_id, identity, action)?;
    Ok(task)
}

/// Create an open task owned by the caller.
#[instrument(skip_all, name = "task.service.create_task")]
pub async fn create_task(
    tasks: &dyn TaskRepository,
    identity: &Identity,
    request: TaskCreateRequest,
) -> Result<TaskResponse, TaskError> {
    request.validate()?;

    let task = tasks
        .insert_task(NewTask {
            owner_id: identity.subject_id(),
            title: request.title,
            description: request.description,
            status: TaskStatus::Open,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(
        target: "task.service.task",
        task_id = task.id,
        user_id = identity.subject_id(),
        "Task created"
    );

    Ok(TaskResponse::from(task))
}

/// List the caller's tasks. Other users' tasks are never visible.
#[instrument(skip_all, name = "task.service.list_tasks")]
pub async fn list_tasks(
    tasks: &dyn TaskRepository,
    identity: &Identity,
    search: TaskSearchRequest,
) -> Result<TaskPageResponse, TaskError> {
    let query = search.into_query()?;
    let (page, total) = tasks.search_tasks(identity.subject_id(), &query).await?;

    Ok(TaskPageResponse::from_page(page, total, &query))
}

#[instrument(skip_all, name = "task.service.get_task", fields(task_id = id))]
pub async fn get_task(
    tasks: &dyn TaskRepository,
    identity: &Identity,
    id: i64,
) -> Result<TaskResponse, TaskError> {
    let task = find_owned(tasks, identity, id, TaskAction::Access).await?;
    Ok(TaskResponse::from(task))
}

/// Mark the task done. A task that is already done is left untouched and
/// yields `Conflict`.
#[instrument(skip_all, name = "task.service.complete_task", fields(task_id = id))]
pub async fn complete_task(
    tasks: &dyn TaskRepository,
    identity: &Identity,
    id: i64,
) -> Result<TaskResponse, TaskError> {
    let task = find_owned(tasks, identity, id, TaskAction::Update).await?;
    task.status.complete()?;

    // A concurrent completion or delete between the read and the write.
    let updated = tasks.complete_task_if_open(id).await?.ok_or_else(|| {
        TaskError::Conflict("Task status is already done".to_string())
    })?;

    tracing::info!(
        target: "task.service.task",
        task_id = id,
        user_id = identity.subject_id(),
        "Task completed"
    );

    Ok(TaskResponse::from(updated))
}

#[instrument(skip_all, name = "task.service.delete_task", fields(task_id = id))]
pub async fn delete_task(
    tasks: &dyn TaskRepository,
    identity: &Identity,
    id: i64,
) -> Result<(), TaskError> {
    find_owned(tasks, identity, id, TaskAction::Delete).await?;

    if !tasks.delete_task(id).await? {
        return Err(not_found(id));
    }

    tracing::info!(
        target: "task.service.task",
        task_id = id,
        user_id = identity.subject_id(),
        "Task deleted"
    );

    Ok(())
}
