//! Turns raw statement payloads into the renderable [`QueryResult`] shape.

use geniebot_core::QueryResult;

use crate::api::StatementResult;

pub(crate) const NO_DATA_GUIDANCE: &str = "The query completed successfully but returned no data. This could mean:\n\
• The data might not exist for the specified parameters\n\
• You might need additional permissions\n\n\
Try:\n\
• Verifying the parameters in your query\n\
• Checking your access permissions";

pub(crate) const WORKSPACE_PLACEHOLDER_GUIDANCE: &str = "I notice you're querying workspace-specific data. \
Please specify which workspace you'd like to analyze. For example:\n\
• 'Show me the top spender in workspace 123456'\n\
• 'Who used the most compute in workspace my-workspace-name'";

/// Marker Genie leaves in generated SQL when the workspace was ambiguous.
pub(crate) const WORKSPACE_PLACEHOLDER: &str = "<current_workspace_id>";

/// Flatten a statement payload into columns and rows. A succeeded statement
/// with no rows becomes guidance text instead of an empty table.
pub fn process_query_result(statement: &StatementResult) -> QueryResult {
    let response = &statement.statement_response;

    let has_rows = response
        .result
        .as_ref()
        .map(|data| !data.data_typed_array.is_empty())
        .unwrap_or(false);

    if response.status.state == "SUCCEEDED" && !has_rows {
        return QueryResult::text_only(NO_DATA_GUIDANCE);
    }

    let mut shaped = QueryResult::default();

    if let (Some(manifest), Some(data)) = (&response.manifest, &response.result) {
        shaped.columns =
            manifest.schema.columns.iter().map(|column| column.name.clone()).collect();

        for row in &data.data_typed_array {
            shaped.rows.push(row.values.iter().map(|cell| cell.value.clone()).collect());
        }

        // Single scalar answers (counts, sums) read better as a sentence.
        // Rows can arrive with fewer cells than the schema promises.
        if shaped.columns.len() == 1 && shaped.rows.len() == 1 {
            if let Some(cell) = shaped.rows[0].first() {
                let column = &shaped.columns[0];
                let value = cell.clone().unwrap_or_else(|| "None".to_string());
                shaped.text = format!("Result: {column} = {value}\n");
            }
        }
    }

    shaped
}

#[cfg(test)]
mod tests {
    use crate::api::{
        StatementColumn, StatementData, StatementManifest, StatementResponse, StatementResult,
        StatementSchema, StatementStatus, TypedRow, TypedValue,
    };

    use super::{process_query_result, NO_DATA_GUIDANCE};

    fn statement(
        state: &str,
        columns: &[&str],
        rows: Vec<Vec<Option<&str>>>,
    ) -> StatementResult {
        StatementResult {
            statement_response: StatementResponse {
                status: StatementStatus { state: state.to_string() },
                manifest: Some(StatementManifest {
                    schema: StatementSchema {
                        columns: columns
                            .iter()
                            .map(|name| StatementColumn { name: (*name).to_string() })
                            .collect(),
                    },
                }),
                result: Some(StatementData {
                    data_typed_array: rows
                        .into_iter()
                        .map(|row| TypedRow {
                            values: row
                                .into_iter()
                                .map(|cell| TypedValue { value: cell.map(str::to_string) })
                                .collect(),
                        })
                        .collect(),
                }),
            },
        }
    }

    #[test]
    fn succeeded_without_rows_becomes_guidance() {
        let shaped = process_query_result(&statement("SUCCEEDED", &["total"], Vec::new()));
        assert_eq!(shaped.text, NO_DATA_GUIDANCE);
        assert!(!shaped.has_table());
    }

    #[test]
    fn columns_and_rows_are_flattened() {
        let shaped = process_query_result(&statement(
            "SUCCEEDED",
            &["workspace", "dbus"],
            vec![vec![Some("prod"), Some("120")], vec![Some("dev"), None]],
        ));

        assert_eq!(shaped.columns, vec!["workspace", "dbus"]);
        assert_eq!(shaped.rows.len(), 2);
        assert!(shaped.rows[1][1].is_none());
        assert!(shaped.text.is_empty());
    }

    #[test]
    fn single_scalar_gets_a_readable_sentence() {
        let shaped =
            process_query_result(&statement("SUCCEEDED", &["total_cost"], vec![vec![Some("42.5")]]));
        assert_eq!(shaped.text, "Result: total_cost = 42.5\n");
        assert!(shaped.has_table());
    }

    #[test]
    fn single_null_scalar_prints_none() {
        let shaped =
            process_query_result(&statement("SUCCEEDED", &["total_cost"], vec![vec![None]]));
        assert_eq!(shaped.text, "Result: total_cost = None\n");
    }

    #[test]
    fn single_row_without_cells_is_left_unsummarized() {
        let shaped = process_query_result(&statement("SUCCEEDED", &["total"], vec![vec![]]));

        assert!(shaped.text.is_empty());
        assert_eq!(shaped.columns, vec!["total"]);
        assert_eq!(shaped.rows, vec![Vec::<Option<String>>::new()]);
    }
}
