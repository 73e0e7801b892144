//! Raw HTTP access to the Genie conversation endpoints under
//! `/api/2.0/genie/spaces/{space_id}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GenieApiError {
    #[error("genie request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("genie returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Identifiers handed back when a conversation is opened.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ConversationHandle {
    pub conversation_id: String,
    pub message_id: String,
}

#[derive(Debug, Deserialize)]
struct AddMessageResponse {
    message_id: String,
}

/// Message state as polled from the conversation endpoint. The raw string is
/// kept because the API has reported several spellings for the same state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageStatus {
    Completed,
    Failed,
    InProgress,
    Other(String),
}

impl MessageStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "COMPLETE" | "COMPLETED" => Self::Completed,
            "ERROR" | "FAILED" => Self::Failed,
            "IN_PROGRESS" | "PENDING" | "RUNNING" => Self::InProgress,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MessageSnapshot {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl MessageSnapshot {
    pub fn parsed_status(&self) -> MessageStatus {
        MessageStatus::parse(&self.status)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub text: Option<TextAttachment>,
    #[serde(default)]
    pub query: Option<QueryAttachment>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TextAttachment {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct QueryAttachment {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
}

/// Payload of the `query-result` endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub statement_response: StatementResponse,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatementResponse {
    #[serde(default)]
    pub status: StatementStatus,
    #[serde(default)]
    pub manifest: Option<StatementManifest>,
    #[serde(default)]
    pub result: Option<StatementData>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatementStatus {
    #[serde(default)]
    pub state: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatementManifest {
    #[serde(default)]
    pub schema: StatementSchema,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatementSchema {
    #[serde(default)]
    pub columns: Vec<StatementColumn>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatementColumn {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatementData {
    #[serde(default)]
    pub data_typed_array: Vec<TypedRow>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TypedRow {
    #[serde(default)]
    pub values: Vec<TypedValue>,
}

/// A single cell. Absent `str` means SQL NULL.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TypedValue {
    #[serde(rename = "str")]
    pub value: Option<String>,
}

#[async_trait]
pub trait GenieApi: Send + Sync {
    async fn start_conversation(&self, question: &str)
        -> Result<ConversationHandle, GenieApiError>;

    async fn add_message(
        &self,
        conversation_id: &str,
        question: &str,
    ) -> Result<String, GenieApiError>;

    async fn get_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<MessageSnapshot, GenieApiError>;

    async fn get_query_result(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<StatementResult, GenieApiError>;
}

pub struct HttpGenieApi {
    client: Client,
    host: String,
    space_id: String,
    token: SecretString,
}

impl HttpGenieApi {
    pub fn new(
        host: impl Into<String>,
        space_id: impl Into<String>,
        token: SecretString,
        timeout: Duration,
    ) -> Result<Self, GenieApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, host: host.into(), space_id: space_id.into(), token })
    }

    fn space_url(&self, suffix: &str) -> String {
        format!("{}/api/2.0/genie/spaces/{}{}", self.host, self.space_id, suffix)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GenieApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GenieApiError::Status { status: status.as_u16(), body })
    }
}

#[async_trait]
impl GenieApi for HttpGenieApi {
    async fn start_conversation(
        &self,
        question: &str,
    ) -> Result<ConversationHandle, GenieApiError> {
        let url = self.space_url("/start-conversation");
        debug!(event_name = "genie_start_conversation", url = %url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&json!({ "content": question }))
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        question: &str,
    ) -> Result<String, GenieApiError> {
        let url = self.space_url(&format!("/conversations/{conversation_id}/messages"));
        debug!(event_name = "genie_add_message", url = %url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&json!({ "content": question }))
            .send()
            .await?;

        let parsed: AddMessageResponse = Self::check(response).await?.json().await?;
        Ok(parsed.message_id)
    }

    async fn get_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<MessageSnapshot, GenieApiError> {
        let url = self.space_url(&format!("/conversations/{conversation_id}/messages/{message_id}"));

        let response =
            self.client.get(&url).bearer_auth(self.token.expose_secret()).send().await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_query_result(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<StatementResult, GenieApiError> {
        let url = self
            .space_url(&format!("/conversations/{conversation_id}/messages/{message_id}/query-result"));

        let response =
            self.client.get(&url).bearer_auth(self.token.expose_secret()).send().await?;

        Ok(Self::check(response).await?.json().await?)
    }
}
