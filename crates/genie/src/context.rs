//! Per-user conversation tracking so follow-up questions land in the same
//! Genie conversation.

use std::collections::HashMap;
use std::sync::Mutex;

pub struct ConversationStore {
    maintain_context: bool,
    conversations: Mutex<HashMap<String, String>>,
}

impl ConversationStore {
    pub fn new(maintain_context: bool) -> Self {
        Self { maintain_context, conversations: Mutex::new(HashMap::new()) }
    }

    /// Conversation to continue for this user, if context is kept.
    pub fn get(&self, user_id: &str) -> Option<String> {
        if !self.maintain_context {
            return None;
        }
        self.lock().get(user_id).cloned()
    }

    /// Remember the conversation opened by a user's first question. Later
    /// turns keep the original conversation.
    pub fn record(&self, user_id: &str, conversation_id: &str) {
        if !self.maintain_context {
            return;
        }
        self.lock().entry(user_id.to_string()).or_insert_with(|| conversation_id.to_string());
    }

    pub fn reset(&self, user_id: &str) {
        self.lock().remove(user_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.conversations.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::ConversationStore;

    #[test]
    fn records_only_the_first_conversation() {
        let store = ConversationStore::new(true);
        store.record("U1", "conv-1");
        store.record("U1", "conv-2");
        assert_eq!(store.get("U1").as_deref(), Some("conv-1"));
    }

    #[test]
    fn context_is_isolated_per_user() {
        let store = ConversationStore::new(true);
        store.record("U1", "conv-1");
        assert_eq!(store.get("U2"), None);
    }

    #[test]
    fn disabled_context_never_remembers() {
        let store = ConversationStore::new(false);
        store.record("U1", "conv-1");
        assert_eq!(store.get("U1"), None);
    }

    #[test]
    fn reset_forgets_the_conversation() {
        let store = ConversationStore::new(true);
        store.record("U1", "conv-1");
        store.reset("U1");
        assert_eq!(store.get("U1"), None);
    }
}
