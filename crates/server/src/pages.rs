//! Informational pages: a small landing page and a configuration presence
//! check for deployment debugging.

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use secrecy::ExposeSecret;
use serde_json::{json, Value};

use crate::bootstrap::AppState;

const HOME_PAGE: &str = r#"<html>
    <head>
        <title>Databricks Genie Slack Bot</title>
        <style>
            body { font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; }
            h1 { color: #333; }
            .container { max-width: 800px; margin: 0 auto; }
            .status { padding: 20px; background-color: #f5f5f5; border-radius: 5px; }
            .info { margin-top: 20px; }
        </style>
    </head>
    <body>
        <div class="container">
            <h1>Databricks Genie Slack Bot</h1>
            <p>This is a Slack bot that integrates with Databricks Genie API to provide natural language querying capabilities.</p>

            <div class="status">
                <h2>Status</h2>
                <p>The bot is running and listening for Slack events at <code>/slack/events</code>.</p>
            </div>

            <div class="info">
                <h2>Usage</h2>
                <p>In your configured Slack channel, simply type your data-related question, and the bot will process it through Databricks Genie.</p>
            </div>
        </div>
    </body>
</html>
"#;

pub async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

/// Reports which settings are present without revealing their values. The
/// host is shown as-is since it is not a secret.
pub async fn debug(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;

    let host = if config.genie.host.is_empty() {
        Value::Null
    } else {
        Value::String(config.genie.host.clone())
    };

    Json(json!({
        "slack_bot_token": !config.slack.bot_token.expose_secret().is_empty(),
        "slack_channel_id": config.slack.channel_id.is_some(),
        "slack_signing_secret": !config.slack.signing_secret.expose_secret().is_empty(),
        "databricks_host": host,
        "databricks_token": !config.genie.token.expose_secret().is_empty(),
        "space_id": !config.genie.space_id.trim().is_empty(),
    }))
}
