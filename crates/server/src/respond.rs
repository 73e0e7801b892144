//! Maps interface errors onto HTTP responses. The body carries only the
//! user-safe message and the correlation id; internal detail stays in logs.

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use geniebot_core::InterfaceError;

pub fn interface_error(error: &InterfaceError) -> (StatusCode, Json<Value>) {
    let status = match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = json!({
        "error": error.user_message(),
        "correlation_id": error.correlation_id(),
    });

    (status, Json(body))
}
