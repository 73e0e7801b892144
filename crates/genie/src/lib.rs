//! Databricks Genie conversation API client: wire types, polling client, and
//! per-user conversation context tracking.

pub mod api;
pub mod client;
pub mod context;
pub mod shape;

pub use api::{GenieApi, GenieApiError, HttpGenieApi, MessageSnapshot, MessageStatus};
pub use client::{GenieClient, GenieError, PollPolicy};
pub use context::ConversationStore;
