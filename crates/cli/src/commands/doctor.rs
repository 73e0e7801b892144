use geniebot_core::config::{AppConfig, LoadOptions};
use geniebot_slack::{AuthInfo, HttpSlackApi, SlackApi, SlackApiError};
use serde::Serialize;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });

            match config.require_credentials() {
                Ok(()) => {
                    checks.push(DoctorCheck {
                        name: "credential_presence",
                        status: CheckStatus::Pass,
                        details: "slack and genie credentials are all set".to_string(),
                    });
                    checks.push(check_slack_authentication(&config));
                }
                Err(error) => {
                    checks.push(DoctorCheck {
                        name: "credential_presence",
                        status: CheckStatus::Fail,
                        details: error.to_string(),
                    });
                    checks.push(DoctorCheck {
                        name: "slack_authentication",
                        status: CheckStatus::Skipped,
                        details: "skipped because credentials are incomplete".to_string(),
                    });
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "credential_presence",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "slack_authentication",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_authentication(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "slack_authentication",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let api = HttpSlackApi::new(config.slack.bot_token.clone());
    let result = runtime.block_on(api.auth_test());

    match result {
        Ok(info) => DoctorCheck {
            name: "slack_authentication",
            status: CheckStatus::Pass,
            details: auth_details(&info),
        },
        Err(error) => DoctorCheck {
            name: "slack_authentication",
            status: CheckStatus::Fail,
            details: describe_slack_failure(&error),
        },
    }
}

fn auth_details(info: &AuthInfo) -> String {
    format!(
        "authenticated as `{}` in team `{}`",
        info.user.as_deref().unwrap_or("unknown"),
        info.team.as_deref().unwrap_or("unknown"),
    )
}

fn describe_slack_failure(error: &SlackApiError) -> String {
    match error {
        SlackApiError::Api { error } if error == "not_allowed_token_type" => {
            "Slack rejected the token type. Use the Bot User OAuth Token (xoxb-...), not an app or user token".to_string()
        }
        SlackApiError::Api { error } if error == "invalid_auth" => {
            "Slack rejected the token. Reinstall the app and copy a fresh Bot User OAuth Token".to_string()
        }
        other => format!("auth.test failed: {other}"),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
