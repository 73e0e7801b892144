//! Polling client over the conversation API. A question either opens a new
//! conversation or continues an existing one, then the message is polled
//! until it completes, fails, or the attempt budget runs out.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use geniebot_core::{QueryOutcome, QueryResult};

use crate::api::{GenieApi, GenieApiError, MessageStatus};
use crate::context::ConversationStore;
use crate::shape::{self, WORKSPACE_PLACEHOLDER, WORKSPACE_PLACEHOLDER_GUIDANCE};

/// Attempts after which results are fetched speculatively even while the
/// message still reports in-progress. The API occasionally has results before
/// it flips the message status.
const SPECULATIVE_FETCH_AFTER: u32 = 4;

#[derive(Clone, Copy, Debug)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

#[derive(Debug, Error)]
pub enum GenieError {
    #[error(transparent)]
    Api(#[from] GenieApiError),
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Query timed out after {attempts} attempts")]
    Timeout { attempts: u32 },
}

pub struct GenieClient<A> {
    api: A,
    policy: PollPolicy,
}

impl<A: GenieApi> GenieClient<A> {
    pub fn new(api: A, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// Run one conversation turn, continuing `conversation_id` when given.
    pub async fn query_data(
        &self,
        question: &str,
        conversation_id: Option<&str>,
    ) -> Result<QueryOutcome, GenieError> {
        let (conversation_id, message_id) = match conversation_id {
            None => {
                let handle = self.api.start_conversation(question).await?;
                (handle.conversation_id, handle.message_id)
            }
            Some(existing) => {
                let message_id = self.api.add_message(existing, question).await?;
                (existing.to_string(), message_id)
            }
        };

        info!(
            event_name = "genie_query_started",
            conversation_id = %conversation_id,
            message_id = %message_id,
        );

        for attempt in 0..self.policy.max_attempts {
            tokio::time::sleep(self.policy.interval).await;

            let snapshot = match self.api.get_message(&conversation_id, &message_id).await {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    if attempt + 1 == self.policy.max_attempts {
                        return Err(error.into());
                    }
                    warn!(
                        event_name = "genie_poll_retry",
                        attempt = attempt + 1,
                        error = %error,
                    );
                    continue;
                }
            };

            match snapshot.parsed_status() {
                MessageStatus::Completed => {
                    match self.collect_completed(&conversation_id, &message_id, &snapshot).await {
                        Ok(Some(result)) => {
                            return Ok(QueryOutcome {
                                conversation_id,
                                message_id: Some(message_id),
                                result,
                                note: None,
                            });
                        }
                        // Completed but no usable attachment yet. Keep polling.
                        Ok(None) => {}
                        Err(error) => {
                            if attempt + 1 == self.policy.max_attempts {
                                return Err(error);
                            }
                            warn!(
                                event_name = "genie_result_retry",
                                attempt = attempt + 1,
                                error = %error,
                            );
                        }
                    }
                }
                MessageStatus::Failed => {
                    let message = snapshot
                        .error_message
                        .unwrap_or_else(|| "Unknown error occurred".to_string());
                    return Err(GenieError::Query(message));
                }
                MessageStatus::InProgress if attempt >= SPECULATIVE_FETCH_AFTER => {
                    match self.api.get_query_result(&conversation_id, &message_id).await {
                        Ok(statement) => {
                            info!(
                                event_name = "genie_speculative_result",
                                status = %snapshot.status,
                            );
                            return Ok(QueryOutcome {
                                conversation_id,
                                message_id: Some(message_id),
                                result: shape::process_query_result(&statement),
                                note: Some(format!(
                                    "Results retrieved while status was '{}'",
                                    snapshot.status
                                )),
                            });
                        }
                        Err(error) => {
                            debug!(
                                event_name = "genie_speculative_miss",
                                status = %snapshot.status,
                                error = %error,
                            );
                        }
                    }
                }
                _ => {}
            }
        }

        Err(GenieError::Timeout { attempts: self.policy.max_attempts })
    }

    /// Turn for a specific user, threading conversation context through the
    /// store so follow-ups stay in the same conversation.
    pub async fn ask(
        &self,
        store: &ConversationStore,
        user_id: &str,
        question: &str,
    ) -> Result<QueryOutcome, GenieError> {
        let conversation_id = store.get(user_id);
        let outcome = self.query_data(question, conversation_id.as_deref()).await?;
        store.record(user_id, &outcome.conversation_id);
        Ok(outcome)
    }

    /// First matching attachment wins: a text answer is returned as-is, a
    /// generated query is executed and its rows fetched.
    async fn collect_completed(
        &self,
        conversation_id: &str,
        message_id: &str,
        snapshot: &crate::api::MessageSnapshot,
    ) -> Result<Option<QueryResult>, GenieError> {
        for attachment in &snapshot.attachments {
            if let Some(text) = &attachment.text {
                if let Some(content) = &text.content {
                    return Ok(Some(QueryResult::text_only(content.clone())));
                }
            }

            if let Some(query) = &attachment.query {
                let query_description = query.description.clone().unwrap_or_default();
                let sql_query = query.query.clone().unwrap_or_default();

                if sql_query.contains(WORKSPACE_PLACEHOLDER) {
                    let mut result = QueryResult::text_only(WORKSPACE_PLACEHOLDER_GUIDANCE);
                    result.query_description = query_description;
                    result.sql_query = sql_query;
                    return Ok(Some(result));
                }

                let statement = self.api.get_query_result(conversation_id, message_id).await?;
                let mut result = shape::process_query_result(&statement);
                result.query_description = query_description;
                result.sql_query = sql_query;
                return Ok(Some(result));
            }
        }

        Ok(None)
    }
}
