//! Shaped Genie query results as they travel between the Genie client, the
//! Slack renderer, and the HTTP query endpoint.

use serde::{Deserialize, Serialize};

/// A Genie answer flattened into renderable parts. Every field may be empty;
/// the Slack renderer decides what to show based on what is present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub text: String,
    pub query_description: String,
    pub sql_query: String,
    pub columns: Vec<String>,
    /// Row cells as returned by the statement response; `None` preserves SQL
    /// NULLs so the renderer can distinguish them from empty strings.
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn has_table(&self) -> bool {
        !self.columns.is_empty() && !self.rows.is_empty()
    }
}

/// Outcome of a full conversation turn against Genie.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub conversation_id: String,
    pub message_id: Option<String>,
    pub result: QueryResult,
    /// Set when results were retrieved through a non-standard path, for
    /// example while the message status still reported in-progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::QueryResult;

    #[test]
    fn text_only_result_has_no_table() {
        let result = QueryResult::text_only("done");
        assert_eq!(result.text, "done");
        assert!(!result.has_table());
    }

    #[test]
    fn table_requires_both_columns_and_rows() {
        let mut result = QueryResult { columns: vec!["sku".to_string()], ..QueryResult::default() };
        assert!(!result.has_table());

        result.rows.push(vec![Some("SKU-1".to_string())]);
        assert!(result.has_table());
    }
}
