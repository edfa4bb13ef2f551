/**
 * API Routes
 *
 * Every route here sits behind the auth layer.
 *
 * # Routes
 *
 * ## Tasks
 * - `POST /api/tasks` - Create a task
 * - `GET /api/tasks` - List the caller's active tasks
 * - `GET /api/tasks/{id}` - Fetch a task
 * - `PUT /api/tasks/{id}` - Update a task
 * - `DELETE /api/tasks/{id}` - Soft-delete a task
 * - `GET /api/tasks/{id}/events` - Event log of a task
 * - `POST /api/tasks/sync` - Replay an offline queue
 * - `GET /api/tasks/ws` - WebSocket for live updates
 *
 * ## Access control
 * - `POST /api/acl` - Grant permissions
 * - `POST /api/share` - Share with several grantees
 * - `GET /api/acl/{resource_id}` - List grants on a resource
 * - `DELETE /api/acl/{resource_id}` - Revoke a grant
 * - `GET /api/shared-with-me` - Resources shared with the caller
 * - `GET /api/shared-by-me` - Resources the caller shared
 */

use axum::{
    routing::{get, post},
    Router,
};

use crate::backend::acl::handlers::{
    grant_access, list_grants, revoke_access, share_resource, shared_by_me, shared_with_me,
};
use crate::backend::realtime::handle_task_socket;
use crate::backend::server::state::AppState;
use crate::backend::sync::handlers::sync_tasks;
use crate::backend::tasks::handlers::{
    create_task, delete_task, get_task, list_tasks, task_events, update_task,
};

/// Add task, sync, WebSocket and ACL routes to `router`
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        // Tasks
        .route("/api/tasks", post(create_task).get(list_tasks))
        .route("/api/tasks/sync", post(sync_tasks))
        .route("/api/tasks/ws", get(handle_task_socket))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/events", get(task_events))
        // Access control
        .route("/api/acl", post(grant_access))
        .route("/api/share", post(share_resource))
        .route(
            "/api/acl/{resource_id}",
            get(list_grants).delete(revoke_access),
        )
        .route("/api/shared-with-me", get(shared_with_me))
        .route("/api/shared-by-me", get(shared_by_me))
}
