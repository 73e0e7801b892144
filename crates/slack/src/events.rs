//! Inbound payloads from the Slack Events API. Every field is optional on
//! the wire; handlers decide what is required.

use serde::Deserialize;

/// Outer envelope of an Events API request. `url_verification` carries a
/// challenge, `event_callback` carries an event.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub event: Option<InboundEvent>,
    #[serde(default)]
    pub event_id: Option<String>,
}

impl EventEnvelope {
    pub fn is_url_verification(&self) -> bool {
        self.kind == "url_verification"
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct InboundEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub channel_type: Option<String>,
}
