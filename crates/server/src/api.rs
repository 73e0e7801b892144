//! Direct query endpoint for testing the Genie pipeline without Slack.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;
use uuid::Uuid;

use geniebot_core::QueryOutcome;

use crate::bootstrap::AppState;
use crate::respond;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryOutcome>, (StatusCode, Json<Value>)> {
    let question = request.question.as_deref().map(str::trim).unwrap_or_default();
    if question.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No question provided" })),
        ));
    }

    let user_id = request.user_id.as_deref().unwrap_or("api_user");
    match state.service.query(user_id, question).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(query_error) => {
            let interface = query_error.into_interface(Uuid::new_v4().to_string());
            error!(
                event_name = "api_query_failed",
                correlation_id = %interface.correlation_id(),
                error = %interface,
            );
            Err(respond::interface_error(&interface))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::bootstrap::router;
    use crate::testutil::state;

    async fn post_query(fail_queries: bool, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router(state(fail_queries)).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_question_is_a_bad_request() {
        let (status, payload) = post_query(false, r#"{"user_id":"tester"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"], "No question provided");
    }

    #[tokio::test]
    async fn blank_question_is_a_bad_request() {
        let (status, _) = post_query(false, r#"{"question":"   "}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn successful_query_returns_the_outcome() {
        let (status, payload) = post_query(false, r#"{"question":"total usage?"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["conversation_id"], "conv-1");
        assert_eq!(payload["result"]["text"], "Result: total = 42\n");
        assert!(payload.get("note").is_none());
    }

    #[tokio::test]
    async fn query_failure_maps_to_service_unavailable() {
        let (status, payload) = post_query(true, r#"{"question":"broken"}"#).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            payload["error"],
            "The service is temporarily unavailable. Please retry shortly."
        );
        assert!(payload["correlation_id"].is_string());
        assert!(!payload.to_string().contains("genie is down"));
    }
}
