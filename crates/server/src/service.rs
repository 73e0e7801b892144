//! Bridges the Slack bot's query seam onto the Genie client.

use async_trait::async_trait;

use geniebot_core::{ApplicationError, QueryOutcome};
use geniebot_genie::{ConversationStore, GenieApi, GenieClient};
use geniebot_slack::QueryService;

pub struct GenieQueryService<A> {
    client: GenieClient<A>,
    store: ConversationStore,
}

impl<A: GenieApi> GenieQueryService<A> {
    pub fn new(client: GenieClient<A>, maintain_context: bool) -> Self {
        Self { client, store: ConversationStore::new(maintain_context) }
    }
}

#[async_trait]
impl<A: GenieApi + 'static> QueryService for GenieQueryService<A> {
    async fn query(
        &self,
        user_id: &str,
        question: &str,
    ) -> Result<QueryOutcome, ApplicationError> {
        self.client
            .ask(&self.store, user_id, question)
            .await
            .map_err(|genie_error| ApplicationError::Genie(genie_error.to_string()))
    }
}
