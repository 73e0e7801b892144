//! The `/slack/events` endpoint: challenge handshake, signature check, and
//! background dispatch into the bot.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::{error, warn};
use uuid::Uuid;

use geniebot_core::InterfaceError;
use geniebot_slack::signature::{self, SignatureError};
use geniebot_slack::EventEnvelope;

use crate::bootstrap::AppState;
use crate::respond;

pub async fn slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    let envelope: EventEnvelope = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(parse_error) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid payload: {parse_error}") })),
            );
        }
    };

    // The URL verification handshake arrives while the endpoint is being
    // registered; answer it before any other checks.
    if let Some(challenge) = envelope.challenge {
        return (StatusCode::OK, Json(json!({ "challenge": challenge })));
    }

    let correlation_id =
        envelope.event_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Err(signature_error) = verify_signature(&state, &headers, &body) {
        warn!(
            event_name = "slack_signature_rejected",
            correlation_id = %correlation_id,
            error = %signature_error,
        );
        let interface = InterfaceError::Unauthorized {
            message: signature_error.to_string(),
            correlation_id,
        };
        return respond::interface_error(&interface);
    }

    if let Some(event) = envelope.event {
        let bot = state.bot.clone();

        // Slack retries events that are not acknowledged within 3 seconds,
        // and Genie polling takes far longer than that. Acknowledge now and
        // answer from a background task.
        tokio::spawn(async move {
            if let Err(handle_error) = bot.handle_event(&event, &correlation_id).await {
                error!(
                    event_name = "slack_event_failed",
                    correlation_id = %correlation_id,
                    error = %handle_error,
                );
            }
        });
    }

    (StatusCode::OK, Json(json!({ "ok": true })))
}

fn verify_signature(
    state: &AppState,
    headers: &HeaderMap,
    body: &str,
) -> Result<(), SignatureError> {
    let timestamp = headers
        .get("x-slack-request-timestamp")
        .and_then(|value| value.to_str().ok())
        .ok_or(SignatureError::MissingHeaders)?;
    let provided = headers
        .get("x-slack-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or(SignatureError::MissingHeaders)?;

    signature::verify(
        state.config.slack.signing_secret.expose_secret(),
        timestamp,
        body,
        provided,
        Utc::now().timestamp(),
    )
}
