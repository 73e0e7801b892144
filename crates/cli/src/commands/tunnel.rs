//! Discovers the active ngrok tunnel through its local inspector API and
//! prints the Slack event subscription checklist for it.

use std::time::Duration;

use serde::Deserialize;

use geniebot_core::config::{AppConfig, LoadOptions, TunnelConfig};

use super::CommandResult;

const INSPECTOR_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Deserialize)]
struct TunnelsResponse {
    #[serde(default)]
    tunnels: Vec<TunnelEntry>,
}

#[derive(Debug, Deserialize)]
struct TunnelEntry {
    public_url: String,
    #[serde(default)]
    proto: String,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("tunnel", "config_validation", error.to_string(), 2);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "tunnel",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    match runtime.block_on(fetch_tunnels(&config.tunnel)) {
        Ok(response) => match pick_public_url(&response) {
            Some(public_url) => {
                CommandResult { exit_code: 0, output: render_checklist(public_url, &config.tunnel) }
            }
            None => CommandResult::failure(
                "tunnel",
                "no_tunnels",
                format!(
                    "ngrok is running but reports no tunnels. Start one with: ngrok http {}",
                    config.tunnel.port
                ),
                1,
            ),
        },
        Err(error) => CommandResult::failure(
            "tunnel",
            "tunnel_unreachable",
            format!(
                "could not reach the ngrok inspector at {}: {error}. Start ngrok with: ngrok http {}",
                config.tunnel.inspector_url, config.tunnel.port
            ),
            1,
        ),
    }
}

async fn fetch_tunnels(config: &TunnelConfig) -> Result<TunnelsResponse, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(INSPECTOR_TIMEOUT).build()?;
    let url = format!("{}/api/tunnels", config.inspector_url);

    client.get(url).send().await?.error_for_status()?.json().await
}

/// Prefers the https tunnel, falling back to the first one reported.
fn pick_public_url(response: &TunnelsResponse) -> Option<&str> {
    response
        .tunnels
        .iter()
        .find(|tunnel| tunnel.proto == "https")
        .or_else(|| response.tunnels.first())
        .map(|tunnel| tunnel.public_url.as_str())
}

fn render_checklist(public_url: &str, config: &TunnelConfig) -> String {
    let mut lines = Vec::new();
    lines.push(format!("ngrok tunnel is active at: {public_url}"));
    lines.push(String::new());
    lines.push("Slack configuration checklist:".to_string());
    lines.push("1. Open your Slack app settings and go to Event Subscriptions".to_string());
    lines.push(format!("2. Enable events and set the Request URL to: {public_url}/slack/events"));
    lines.push("3. Under bot events, subscribe to:".to_string());
    lines.push("   - message.channels".to_string());
    lines.push("   - message.groups".to_string());
    lines.push("   - message.im".to_string());
    lines.push("   - app_mention".to_string());
    lines.push("4. Save and reinstall the app if prompted".to_string());
    lines.push(String::new());
    lines.push(format!(
        "The bot server should be listening on port {}. Leave ngrok running.",
        config.port
    ));
    lines.join("\n")
}
