//! Sync HTTP Handler

use axum::{extract::State, Json};

use super::reconciler::SyncReconciler;
use crate::backend::error::BackendResult;
use crate::backend::middleware::AuthUser;
use crate::shared::sync::{SyncRequest, SyncResponse};

/// Replay an offline queue and pull newer state (POST /api/tasks/sync)
pub async fn sync_tasks(
    State(reconciler): State<SyncReconciler>,
    AuthUser(user): AuthUser,
    Json(request): Json<SyncRequest>,
) -> BackendResult<Json<SyncResponse>> {
    Ok(Json(reconciler.sync(&user, request).await?))
}
