//! Tagged result shapes returned by every diagnostic operation.

use crate::error::{DbError, ErrorKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One decoded result row, keyed by column name.
pub type JsonRow = serde_json::Map<String, JsonValue>;

/// Outcome tag shared by all result types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Raw rows produced by a session, before they are tagged.
#[derive(Debug, Clone, Default)]
pub struct QueryRows {
    /// Column names in select-list order
    pub columns: Vec<String>,
    pub rows: Vec<JsonRow>,
}

impl QueryRows {
    pub fn new(columns: Vec<String>, rows: Vec<JsonRow>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// String value of `column` in the first row, if present and non-null.
    pub fn first_str(&self, column: &str) -> Option<&str> {
        self.rows.first()?.get(column)?.as_str()
    }

    /// Boolean value of `column` in the first row.
    pub fn first_bool(&self, column: &str) -> Option<bool> {
        self.rows.first()?.get(column)?.as_bool()
    }
}

/// Result of one diagnostic query.
///
/// `status: error` results still carry empty `rows` so renderers never branch
/// on missing fields.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueryResult {
    pub status: Status,
    /// Catalog entry that produced this result
    pub operation: String,
    /// Column names in select-list order
    pub columns: Vec<String>,
    pub rows: Vec<JsonRow>,
    pub count: usize,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Caveat attached to heuristic results (bloat estimates)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Rendered table/markdown text when a non-JSON format was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
}

impl QueryResult {
    pub fn success(operation: impl Into<String>, rows: QueryRows, execution_time_ms: u64) -> Self {
        let count = rows.rows.len();
        Self {
            status: Status::Success,
            operation: operation.into(),
            columns: rows.columns,
            rows: rows.rows,
            count,
            execution_time_ms,
            error: None,
            error_kind: None,
            suggestion: None,
            note: None,
            formatted: None,
        }
    }

    pub fn failure(operation: impl Into<String>, err: &DbError, execution_time_ms: u64) -> Self {
        Self {
            status: Status::Error,
            operation: operation.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            count: 0,
            execution_time_ms,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
            suggestion: err.suggestion().map(str::to_string),
            note: None,
            formatted: None,
        }
    }

    pub fn with_note(mut self, note: Option<&str>) -> Self {
        self.note = note.map(str::to_string);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: JsonValue) -> JsonRow {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_success_counts_rows() {
        let rows = QueryRows::new(
            vec!["schemaname".into(), "index_scans".into()],
            vec![row(json!({"schemaname": "public", "index_scans": 0}))],
        );
        let result = QueryResult::success("unused_indexes", rows, 3);
        assert!(result.is_success());
        assert_eq!(result.count, 1);
        assert_eq!(result.columns, vec!["schemaname", "index_scans"]);
    }

    #[test]
    fn test_empty_success_is_not_error() {
        let result = QueryResult::success("largest_tables", QueryRows::default(), 1);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["count"], 0);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_is_tagged() {
        let err = DbError::extension_unavailable("pg_stat_statements", "CREATE EXTENSION");
        let result = QueryResult::failure("slow_queries", &err, 2);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error_kind"], "ExtensionUnavailable");
        assert!(json["error"].as_str().unwrap().contains("pg_stat_statements"));
        assert_eq!(json["rows"], json!([]));
    }

    #[test]
    fn test_first_accessors() {
        let rows = QueryRows::new(
            vec!["table_schema".into(), "is_valid".into()],
            vec![row(json!({"table_schema": "sales", "is_valid": true}))],
        );
        assert_eq!(rows.first_str("table_schema"), Some("sales"));
        assert_eq!(rows.first_bool("is_valid"), Some(true));
        assert_eq!(rows.first_str("missing"), None);
        assert_eq!(QueryRows::default().first_str("table_schema"), None);
    }
}
