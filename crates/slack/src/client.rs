//! Minimal Slack Web API client covering what the bot needs:
//! `chat.postMessage` and `auth.test`.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::blocks::Block;

const DEFAULT_BASE_URL: &str = "https://slack.com/api";

#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("slack request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("slack api error: {error}")]
    Api { error: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

/// Identity reported by `auth.test` for the configured bot token.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct AuthInfo {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn post_message(&self, message: &OutboundMessage) -> Result<(), SlackApiError>;
    async fn auth_test(&self) -> Result<AuthInfo, SlackApiError>;
}

pub struct HttpSlackApi {
    client: Client,
    token: SecretString,
    base_url: String,
}

impl HttpSlackApi {
    pub fn new(token: SecretString) -> Self {
        Self { client: Client::new(), token, base_url: DEFAULT_BASE_URL.to_string() }
    }

    pub fn with_base_url(token: SecretString, base_url: impl Into<String>) -> Self {
        Self { client: Client::new(), token, base_url: base_url.into() }
    }
}

#[async_trait]
impl SlackApi for HttpSlackApi {
    async fn post_message(&self, message: &OutboundMessage) -> Result<(), SlackApiError> {
        debug!(event_name = "slack_post_message", channel = %message.channel);

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(self.token.expose_secret())
            .json(message)
            .send()
            .await?;

        let status: ApiStatus = response.json().await?;
        if status.ok {
            Ok(())
        } else {
            Err(SlackApiError::Api {
                error: status.error.unwrap_or_else(|| "unknown_error".to_string()),
            })
        }
    }

    async fn auth_test(&self) -> Result<AuthInfo, SlackApiError> {
        #[derive(Deserialize)]
        struct AuthTestResponse {
            #[serde(default)]
            ok: bool,
            #[serde(default)]
            error: Option<String>,
            #[serde(flatten)]
            info: AuthInfo,
        }

        let response = self
            .client
            .post(format!("{}/auth.test", self.base_url))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await?;

        let parsed: AuthTestResponse = response.json().await?;
        if parsed.ok {
            Ok(parsed.info)
        } else {
            Err(SlackApiError::Api {
                error: parsed.error.unwrap_or_else(|| "unknown_error".to_string()),
            })
        }
    }
}
