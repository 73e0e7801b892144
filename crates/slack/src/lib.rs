//! Slack surface: request signing, inbound event payloads, Block Kit message
//! rendering, the Web API client, and the message-handling bot.

pub mod blocks;
pub mod bot;
pub mod client;
pub mod events;
pub mod signature;

pub use bot::{MessageBot, QueryService};
pub use client::{AuthInfo, HttpSlackApi, OutboundMessage, SlackApi, SlackApiError};
pub use events::{EventEnvelope, InboundEvent};
