//! The message bot: decides which inbound events deserve an answer and
//! drives the ack, query, respond sequence for the ones that do.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use geniebot_core::{ApplicationError, QueryOutcome};

use crate::blocks;
use crate::client::{OutboundMessage, SlackApi};
use crate::events::InboundEvent;

/// Answers a user's natural-language question. Implemented by the Genie
/// query pipeline; faked in tests.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn query(&self, user_id: &str, question: &str)
        -> Result<QueryOutcome, ApplicationError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    BotMessage,
    EmptyText,
    ChannelMismatch,
    UnsupportedSubtype,
    UnsupportedType,
}

impl IgnoreReason {
    fn as_str(&self) -> &'static str {
        match self {
            Self::BotMessage => "bot_message",
            Self::EmptyText => "empty_text",
            Self::ChannelMismatch => "channel_mismatch",
            Self::UnsupportedSubtype => "unsupported_subtype",
            Self::UnsupportedType => "unsupported_type",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Disposition {
    Query { user_id: String, question: String, channel: String, thread_ts: Option<String> },
    Greet { channel: String, thread_ts: Option<String> },
    Ignore(IgnoreReason),
}

pub struct MessageBot {
    api: Arc<dyn SlackApi>,
    service: Arc<dyn QueryService>,
    channel_id: Option<String>,
    format_tables: bool,
}

impl MessageBot {
    pub fn new(
        api: Arc<dyn SlackApi>,
        service: Arc<dyn QueryService>,
        channel_id: Option<String>,
        format_tables: bool,
    ) -> Self {
        Self { api, service, channel_id, format_tables }
    }

    /// Process one event end to end. Ignored events are not an error.
    pub async fn handle_event(
        &self,
        event: &InboundEvent,
        correlation_id: &str,
    ) -> Result<(), ApplicationError> {
        match self.route(event) {
            Disposition::Ignore(reason) => {
                debug!(
                    event_name = "slack_event_ignored",
                    correlation_id = %correlation_id,
                    reason = reason.as_str(),
                );
                Ok(())
            }
            Disposition::Greet { channel, thread_ts } => {
                self.post(&channel, blocks::greeting_text(), None, thread_ts).await
            }
            Disposition::Query { user_id, question, channel, thread_ts } => {
                info!(
                    event_name = "slack_query_received",
                    correlation_id = %correlation_id,
                    user_id = %user_id,
                );

                self.post(
                    &channel,
                    blocks::processing_message(&question),
                    None,
                    thread_ts.clone(),
                )
                .await?;

                match self.service.query(&user_id, &question).await {
                    Ok(outcome) => {
                        let message = blocks::result_message(&outcome.result, self.format_tables);
                        self.post(&channel, message.text, Some(message.blocks), thread_ts).await
                    }
                    Err(query_error) => {
                        error!(
                            event_name = "slack_query_failed",
                            correlation_id = %correlation_id,
                            error = %query_error,
                        );
                        self.post(&channel, blocks::error_text(&query_error), None, thread_ts)
                            .await
                    }
                }
            }
        }
    }

    fn route(&self, event: &InboundEvent) -> Disposition {
        match event.kind.as_str() {
            "message" => {
                if event.subtype.is_some() {
                    return Disposition::Ignore(IgnoreReason::UnsupportedSubtype);
                }
                self.route_text(event, event.text.as_deref().unwrap_or_default())
            }
            "app_mention" => {
                let stripped = strip_mentions(event.text.as_deref().unwrap_or_default());
                if stripped.is_empty() {
                    if let Some(channel) = event.channel.clone() {
                        return Disposition::Greet {
                            channel,
                            thread_ts: event.ts.clone(),
                        };
                    }
                    return Disposition::Ignore(IgnoreReason::ChannelMismatch);
                }
                self.route_text(event, &stripped)
            }
            _ => Disposition::Ignore(IgnoreReason::UnsupportedType),
        }
    }

    fn route_text(&self, event: &InboundEvent, text: &str) -> Disposition {
        // Bot echoes would otherwise loop forever.
        if event.bot_id.is_some() {
            return Disposition::Ignore(IgnoreReason::BotMessage);
        }

        let question = text.trim();
        if question.is_empty() {
            return Disposition::Ignore(IgnoreReason::EmptyText);
        }

        let Some(channel) = event.channel.clone() else {
            return Disposition::Ignore(IgnoreReason::ChannelMismatch);
        };

        // Answer in the configured channel and in DMs; nowhere else.
        let is_dm = event.channel_type.as_deref() == Some("im");
        let channel_allowed = self.channel_id.as_deref() == Some(channel.as_str());
        if !channel_allowed && !is_dm {
            return Disposition::Ignore(IgnoreReason::ChannelMismatch);
        }

        Disposition::Query {
            user_id: event.user.clone().unwrap_or_else(|| "unknown_user".to_string()),
            question: question.to_string(),
            channel,
            thread_ts: event.ts.clone(),
        }
    }

    async fn post(
        &self,
        channel: &str,
        text: String,
        message_blocks: Option<Vec<blocks::Block>>,
        thread_ts: Option<String>,
    ) -> Result<(), ApplicationError> {
        let message = OutboundMessage {
            channel: channel.to_string(),
            text,
            blocks: message_blocks,
            thread_ts,
        };
        self.api
            .post_message(&message)
            .await
            .map_err(|post_error| ApplicationError::Slack(post_error.to_string()))
    }
}

/// Remove `<@U...>` mention tokens and surrounding whitespace.
fn strip_mentions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<@") {
        out.push_str(&rest[..start]);
        match rest[start..].find('>') {
            Some(offset) => rest = rest[start + offset + 1..].trim_start(),
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use geniebot_core::{ApplicationError, QueryOutcome, QueryResult};

    use crate::client::{AuthInfo, OutboundMessage, SlackApi, SlackApiError};
    use crate::events::InboundEvent;

    use super::{strip_mentions, MessageBot, QueryService};

    #[derive(Default)]
    struct RecordingApi {
        posted: Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl SlackApi for RecordingApi {
        async fn post_message(&self, message: &OutboundMessage) -> Result<(), SlackApiError> {
            self.posted.lock().await.push(message.clone());
            Ok(())
        }

        async fn auth_test(&self) -> Result<AuthInfo, SlackApiError> {
            Ok(AuthInfo::default())
        }
    }

    #[derive(Default)]
    struct ScriptedService {
        responses: Mutex<VecDeque<Result<QueryOutcome, ApplicationError>>>,
        questions: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl QueryService for ScriptedService {
        async fn query(
            &self,
            user_id: &str,
            question: &str,
        ) -> Result<QueryOutcome, ApplicationError> {
            self.questions.lock().await.push((user_id.to_string(), question.to_string()));
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(ApplicationError::Genie("unscripted query".to_string())))
        }
    }

    fn outcome(text: &str) -> QueryOutcome {
        QueryOutcome {
            conversation_id: "conv-1".to_string(),
            message_id: Some("msg-1".to_string()),
            result: QueryResult::text_only(text),
            note: None,
        }
    }

    fn bot(
        service: Arc<ScriptedService>,
        channel_id: Option<&str>,
    ) -> (MessageBot, Arc<RecordingApi>) {
        let api = Arc::new(RecordingApi::default());
        let bot = MessageBot::new(
            api.clone(),
            service,
            channel_id.map(str::to_string),
            true,
        );
        (bot, api)
    }

    fn channel_message(text: &str) -> InboundEvent {
        InboundEvent {
            kind: "message".to_string(),
            text: Some(text.to_string()),
            user: Some("U1".to_string()),
            channel: Some("C-ALLOWED".to_string()),
            ts: Some("1700000000.000100".to_string()),
            channel_type: Some("channel".to_string()),
            ..InboundEvent::default()
        }
    }

    #[tokio::test]
    async fn question_gets_an_ack_then_the_answer_in_thread() {
        let service = Arc::new(ScriptedService::default());
        service.responses.lock().await.push_back(Ok(outcome("Result: total = 42\n")));
        let (bot, api) = bot(service.clone(), Some("C-ALLOWED"));

        bot.handle_event(&channel_message("total usage?"), "req-1").await.unwrap();

        let posted = api.posted.lock().await;
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[0].text, "Processing your query: 'total usage?'...");
        assert_eq!(posted[0].thread_ts.as_deref(), Some("1700000000.000100"));
        assert_eq!(posted[1].text, "Result: total = 42\n");
        assert!(posted[1].blocks.is_some());

        let questions = service.questions.lock().await;
        assert_eq!(questions[0], ("U1".to_string(), "total usage?".to_string()));
    }

    #[tokio::test]
    async fn query_failure_posts_an_apology() {
        let service = Arc::new(ScriptedService::default());
        service
            .responses
            .lock()
            .await
            .push_back(Err(ApplicationError::Genie("Query timed out after 10 attempts".to_string())));
        let (bot, api) = bot(service, Some("C-ALLOWED"));

        bot.handle_event(&channel_message("slow question"), "req-2").await.unwrap();

        let posted = api.posted.lock().await;
        assert_eq!(posted.len(), 2);
        assert!(posted[1].text.starts_with("Sorry, I encountered an error:"));
        assert!(posted[1].text.contains("timed out"));
    }

    #[tokio::test]
    async fn bot_messages_are_ignored() {
        let service = Arc::new(ScriptedService::default());
        let (bot, api) = bot(service, Some("C-ALLOWED"));

        let mut event = channel_message("I am a bot");
        event.bot_id = Some("B1".to_string());
        bot.handle_event(&event, "req-3").await.unwrap();

        assert!(api.posted.lock().await.is_empty());
    }

    #[tokio::test]
    async fn empty_and_subtyped_messages_are_ignored() {
        let service = Arc::new(ScriptedService::default());
        let (bot, api) = bot(service, Some("C-ALLOWED"));

        bot.handle_event(&channel_message("   "), "req-4").await.unwrap();

        let mut joined = channel_message("joined");
        joined.subtype = Some("channel_join".to_string());
        bot.handle_event(&joined, "req-5").await.unwrap();

        assert!(api.posted.lock().await.is_empty());
    }

    #[tokio::test]
    async fn other_channels_are_ignored_but_dms_are_answered() {
        let service = Arc::new(ScriptedService::default());
        service.responses.lock().await.push_back(Ok(outcome("hello")));
        let (bot, api) = bot(service, Some("C-ALLOWED"));

        let mut elsewhere = channel_message("psst");
        elsewhere.channel = Some("C-OTHER".to_string());
        bot.handle_event(&elsewhere, "req-6").await.unwrap();
        assert!(api.posted.lock().await.is_empty());

        let mut dm = channel_message("direct question");
        dm.channel = Some("D-USER".to_string());
        dm.channel_type = Some("im".to_string());
        bot.handle_event(&dm, "req-7").await.unwrap();
        assert_eq!(api.posted.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn bare_mention_gets_a_greeting() {
        let service = Arc::new(ScriptedService::default());
        let (bot, api) = bot(service, Some("C-ALLOWED"));

        let mut event = channel_message("<@UBOT>");
        event.kind = "app_mention".to_string();
        bot.handle_event(&event, "req-8").await.unwrap();

        let posted = api.posted.lock().await;
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].text, "Hi! How can I help you analyze your Databricks usage?");
        assert_eq!(posted[0].thread_ts.as_deref(), Some("1700000000.000100"));
    }

    #[tokio::test]
    async fn mention_with_a_question_is_answered_without_the_mention() {
        let service = Arc::new(ScriptedService::default());
        service.responses.lock().await.push_back(Ok(outcome("answer")));
        let (bot, api) = bot(service.clone(), Some("C-ALLOWED"));

        let mut event = channel_message("<@UBOT> what did we spend?");
        event.kind = "app_mention".to_string();
        bot.handle_event(&event, "req-9").await.unwrap();

        assert_eq!(api.posted.lock().await.len(), 2);
        let questions = service.questions.lock().await;
        assert_eq!(questions[0].1, "what did we spend?");
    }

    #[test]
    fn mention_stripping_handles_multiple_tokens() {
        assert_eq!(strip_mentions("<@U1> hello"), "hello");
        assert_eq!(strip_mentions("<@U1> <@U2> hi there"), "hi there");
        assert_eq!(strip_mentions("no mentions"), "no mentions");
        assert_eq!(strip_mentions("<@U1>"), "");
    }
}
