/**
 * Router Configuration
 *
 * Combines the route groups into one Axum router:
 *
 * 1. `GET /health` - public liveness probe
 * 2. API routes - behind the bearer-token layer
 * 3. Fallback - JSON 404
 *
 * The auth layer is a route layer, so unknown paths answer 404 rather
 * than 401. Request tracing wraps everything.
 */

use axum::{
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::backend::error::BackendError;
use crate::backend::middleware::auth_middleware;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router {
    let protected = configure_api_routes(Router::new()).route_layer(
        middleware::from_fn_with_state(app_state.clone(), auth_middleware),
    );

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .fallback(|| async { BackendError::handler(StatusCode::NOT_FOUND, "route not found") })
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
