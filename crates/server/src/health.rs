use axum::Json;
use chrono::Utc;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub checked_at: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", checked_at: Utc::now().to_rfc3339() })
}
