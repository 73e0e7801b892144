use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use geniebot_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let bot_token = redact_token(config.slack.bot_token.expose_secret());
    lines.push(render_line(
        "slack.bot_token",
        &bot_token,
        source("slack.bot_token", &["GENIEBOT_SLACK_BOT_TOKEN", "SLACK_BOT_TOKEN"]),
    ));
    let signing_secret = if config.slack.signing_secret.expose_secret().is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    };
    lines.push(render_line(
        "slack.signing_secret",
        signing_secret,
        source("slack.signing_secret", &["GENIEBOT_SLACK_SIGNING_SECRET", "SLACK_SIGNING_SECRET"]),
    ));
    lines.push(render_line(
        "slack.channel_id",
        config.slack.channel_id.as_deref().unwrap_or("<unset>"),
        source("slack.channel_id", &["GENIEBOT_SLACK_CHANNEL_ID", "SLACK_CHANNEL_ID"]),
    ));
    lines.push(render_line(
        "slack.format_tables",
        &config.slack.format_tables.to_string(),
        source("slack.format_tables", &["GENIEBOT_SLACK_FORMAT_TABLES", "FORMAT_TABLES"]),
    ));

    let host = if config.genie.host.is_empty() { "<unset>" } else { config.genie.host.as_str() };
    lines.push(render_line(
        "genie.host",
        host,
        source("genie.host", &["GENIEBOT_GENIE_HOST", "DATABRICKS_HOST"]),
    ));
    let genie_token = redact_token(config.genie.token.expose_secret());
    lines.push(render_line(
        "genie.token",
        &genie_token,
        source("genie.token", &["GENIEBOT_GENIE_TOKEN", "DATABRICKS_TOKEN"]),
    ));
    let space_id =
        if config.genie.space_id.is_empty() { "<unset>" } else { config.genie.space_id.as_str() };
    lines.push(render_line(
        "genie.space_id",
        space_id,
        source("genie.space_id", &["GENIEBOT_GENIE_SPACE_ID", "SPACE_ID"]),
    ));
    lines.push(render_line(
        "genie.maintain_context",
        &config.genie.maintain_context.to_string(),
        source("genie.maintain_context", &["GENIEBOT_GENIE_MAINTAIN_CONTEXT", "MAINTAIN_CONTEXT"]),
    ));
    lines.push(render_line(
        "genie.max_retries",
        &config.genie.max_retries.to_string(),
        source("genie.max_retries", &["GENIEBOT_GENIE_MAX_RETRIES", "MAX_RETRIES"]),
    ));
    lines.push(render_line(
        "genie.retry_interval_secs",
        &config.genie.retry_interval_secs.to_string(),
        source(
            "genie.retry_interval_secs",
            &["GENIEBOT_GENIE_RETRY_INTERVAL_SECS", "RETRY_INTERVAL"],
        ),
    ));
    lines.push(render_line(
        "genie.timeout_secs",
        &config.genie.timeout_secs.to_string(),
        source("genie.timeout_secs", &["GENIEBOT_GENIE_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", &["GENIEBOT_SERVER_BIND_ADDRESS"]),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", &["GENIEBOT_SERVER_PORT", "PORT"]),
    ));

    lines.push(render_line(
        "launcher.python_bin",
        &config.launcher.python_bin,
        source("launcher.python_bin", &["GENIEBOT_LAUNCHER_PYTHON_BIN"]),
    ));
    lines.push(render_line(
        "launcher.venv_dir",
        &config.launcher.venv_dir.display().to_string(),
        source("launcher.venv_dir", &["GENIEBOT_LAUNCHER_VENV_DIR"]),
    ));
    lines.push(render_line(
        "launcher.requirements",
        &config.launcher.requirements.display().to_string(),
        source("launcher.requirements", &["GENIEBOT_LAUNCHER_REQUIREMENTS"]),
    ));
    lines.push(render_line(
        "launcher.entry",
        &config.launcher.entry.display().to_string(),
        source("launcher.entry", &["GENIEBOT_LAUNCHER_ENTRY"]),
    ));

    lines.push(render_line(
        "tunnel.inspector_url",
        &config.tunnel.inspector_url,
        source("tunnel.inspector_url", &["GENIEBOT_TUNNEL_INSPECTOR_URL"]),
    ));
    lines.push(render_line(
        "tunnel.port",
        &config.tunnel.port.to_string(),
        source("tunnel.port", &["GENIEBOT_TUNNEL_PORT"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["GENIEBOT_LOGGING_LEVEL", "GENIEBOT_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["GENIEBOT_LOGGING_FORMAT", "GENIEBOT_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("geniebot.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/geniebot.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
