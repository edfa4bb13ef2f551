//! Task HTTP Handlers
//!
//! REST surface over [`TaskService`]:
//!
//! - `POST   /api/tasks`             - create
//! - `GET    /api/tasks`             - the caller's active tasks
//! - `GET    /api/tasks/{id}`        - one task (READ)
//! - `PUT    /api/tasks/{id}`        - partial update (WRITE)
//! - `DELETE /api/tasks/{id}`        - soft delete (DELETE, owner only)
//! - `GET    /api/tasks/{id}/events` - event log (READ)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::service::TaskService;
use crate::backend::error::BackendResult;
use crate::backend::middleware::AuthUser;
use crate::shared::task::{CreateTaskRequest, Task, TaskEvent, TaskMutation};

/// Create body; `id` lets a client pick the task id up front
#[derive(Debug, Deserialize)]
pub struct CreateTaskBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub task: CreateTaskRequest,
}

pub async fn create_task(
    State(tasks): State<TaskService>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateTaskBody>,
) -> BackendResult<(StatusCode, Json<Task>)> {
    let task = tasks.create(&user, body.id, body.task).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(tasks): State<TaskService>,
    AuthUser(user): AuthUser,
) -> BackendResult<Json<Vec<Task>>> {
    Ok(Json(tasks.list(&user).await?))
}

pub async fn get_task(
    State(tasks): State<TaskService>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
) -> BackendResult<Json<Task>> {
    Ok(Json(tasks.get(&user, &task_id).await?))
}

pub async fn update_task(
    State(tasks): State<TaskService>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
    Json(mutation): Json<TaskMutation>,
) -> BackendResult<Json<Task>> {
    Ok(Json(tasks.update(&user, &task_id, mutation).await?))
}

pub async fn delete_task(
    State(tasks): State<TaskService>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
) -> BackendResult<StatusCode> {
    tasks.delete(&user, &task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn task_events(
    State(tasks): State<TaskService>,
    AuthUser(user): AuthUser,
    Path(task_id): Path<String>,
) -> BackendResult<Json<Vec<TaskEvent>>> {
    Ok(Json(tasks.events(&user, &task_id).await?))
}
