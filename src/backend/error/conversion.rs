/**
 * Error Conversion
 *
 * Conversions into and out of `BackendError`: store failures become
 * backend errors, and backend errors become HTTP responses.
 *
 * # Response Format
 *
 * Error responses are returned as JSON with the following structure:
 * ```json
 * {
 *   "error": "Error message",
 *   "status": 403
 * }
 * ```
 */

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use crate::backend::error::types::BackendError;
use crate::backend::store::StoreError;

impl IntoResponse for BackendError {
    /// Convert a backend error into an HTTP response
    ///
    /// Server-side failures are logged here so handlers can simply `?`.
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!("[Server] {} {}", status.as_u16(), message);
        }

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for BackendError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) => BackendError::store_unavailable(message),
            StoreError::Timeout(after) => {
                BackendError::store_unavailable(format!("store call timed out after {:?}", after))
            }
            StoreError::Conflict(message) => BackendError::conflict(message),
            StoreError::Corrupt(message) => BackendError::state(message),
        }
    }
}
