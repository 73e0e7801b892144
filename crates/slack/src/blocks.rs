//! Block Kit rendering for query answers: analysis text, SQL, and a markdown
//! table sized to fit Slack's section limits.

use serde::Serialize;

use geniebot_core::QueryResult;

/// Slack rejects section text above 3000 characters; stay under with margin.
const TABLE_CHAR_BUDGET: usize = 2900;
const TABLE_TRUNCATED_ROWS: usize = 10;
const CELL_MAX_CHARS: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { text: TextObject },
}

impl Block {
    pub fn mrkdwn_section(text: impl Into<String>) -> Self {
        Self::Section { text: TextObject::mrkdwn(text) }
    }
}

/// A rendered message: fallback notification text plus rich blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub text: String,
    pub blocks: Vec<Block>,
}

pub fn processing_message(question: &str) -> String {
    format!("Processing your query: '{question}'...")
}

pub fn error_text(error: impl std::fmt::Display) -> String {
    format!("Sorry, I encountered an error: {error}")
}

pub fn greeting_text() -> String {
    "Hi! How can I help you analyze your Databricks usage?".to_string()
}

/// Render a query answer. Sections are added only for the parts that are
/// present; an answer with nothing to show gets a single placeholder block.
pub fn result_message(result: &QueryResult, format_tables: bool) -> MessageTemplate {
    let mut blocks = Vec::new();

    if !result.query_description.is_empty() {
        blocks.push(Block::mrkdwn_section(format!("*Analysis:*\n{}", result.query_description)));
    }

    if !result.sql_query.is_empty() {
        blocks.push(Block::mrkdwn_section(format!(
            "*SQL Query:*\n```sql\n{}\n```",
            result.sql_query
        )));
    }

    if !result.text.is_empty() {
        blocks.push(Block::mrkdwn_section(format!("*Results:*\n{}", result.text)));
    }

    if result.has_table() && format_tables {
        let table = markdown_table(&result.columns, &result.rows);
        blocks.push(Block::mrkdwn_section(format!("```{table}```")));
    }

    if blocks.is_empty() {
        blocks.push(Block::mrkdwn_section("No results to display."));
    }

    MessageTemplate { text: response_text(result), blocks }
}

/// Plain-text fallback shown in notifications and clients without blocks.
fn response_text(result: &QueryResult) -> String {
    if result.text.trim().is_empty() {
        "Results received but no explanatory text was provided.".to_string()
    } else {
        result.text.clone()
    }
}

/// Markdown table with cells truncated and rows capped so the block stays
/// inside Slack's section limit. Ragged rows are padded or clipped to the
/// column count.
pub fn markdown_table(columns: &[String], rows: &[Vec<Option<String>>]) -> String {
    let header_row = format!("| {} |", columns.join(" | "));
    let divider_row = format!("| {} |", vec!["---"; columns.len()].join(" | "));

    let data_rows: Vec<String> = rows
        .iter()
        .map(|row| {
            let mut cells: Vec<String> =
                row.iter().map(|cell| format_cell(cell.as_deref())).collect();
            cells.resize(columns.len(), String::new());
            format!("| {} |", cells.join(" | "))
        })
        .collect();

    let table = format!("{header_row}\n{divider_row}\n{}", data_rows.join("\n"));
    if table.len() <= TABLE_CHAR_BUDGET {
        return table;
    }

    let shown = TABLE_TRUNCATED_ROWS.min(data_rows.len());
    let mut truncated =
        format!("{header_row}\n{divider_row}\n{}", data_rows[..shown].join("\n"));
    if shown < data_rows.len() {
        truncated.push_str(&format!("\n\n_Showing {shown} of {} rows_", data_rows.len()));
    }
    truncated
}

fn format_cell(cell: Option<&str>) -> String {
    let value = cell.unwrap_or_default();
    if value.chars().count() > CELL_MAX_CHARS {
        let kept: String = value.chars().take(CELL_MAX_CHARS - 3).collect();
        format!("{kept}...")
    } else {
        value.to_string()
    }
}
