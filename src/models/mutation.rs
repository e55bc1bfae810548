//! Mutation request and report models.
//!
//! Identifiers supplied by callers are treated the way PostgreSQL treats
//! unquoted identifiers: validated against the plain identifier grammar,
//! folded to lower case, and always emitted double-quoted.

use crate::error::{DbError, DbResult, ErrorKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// NAMEDATALEN - 1
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Validate and fold a plain SQL identifier.
///
/// # Example
///
/// ```
/// use dbops_mcp_server::models::normalize_identifier;
///
/// assert_eq!(normalize_identifier("column", "Customer_ID").unwrap(), "customer_id");
/// assert!(normalize_identifier("column", "id; DROP TABLE x").is_err());
/// ```
pub fn normalize_identifier(what: &str, raw: &str) -> DbResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DbError::invalid_input(format!("{what} name is empty")));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(DbError::invalid_input(format!(
            "{what} name '{name}' exceeds {MAX_IDENTIFIER_LEN} bytes"
        )));
    }
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if !first_ok || !rest_ok {
        return Err(DbError::invalid_input(format!(
            "{what} name '{name}' is not a plain identifier (letters, digits, '_' and '$', not starting with a digit)"
        )));
    }
    Ok(name.to_ascii_lowercase())
}

/// Double-quote an identifier for inclusion in SQL text.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A table reference, optionally schema-qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    /// Parse `table` or `schema.table`.
    pub fn parse(raw: &str) -> DbResult<Self> {
        let parts: Vec<&str> = raw.trim().split('.').collect();
        match parts.as_slice() {
            [name] => Ok(Self {
                schema: None,
                name: normalize_identifier("table", name)?,
            }),
            [schema, name] => Ok(Self {
                schema: Some(normalize_identifier("schema", schema)?),
                name: normalize_identifier("table", name)?,
            }),
            _ => Err(DbError::invalid_input(format!(
                "table '{}' must be 'table' or 'schema.table'",
                raw.trim()
            ))),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A table whose schema has been resolved against the live catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    pub schema: String,
    pub name: String,
}

impl ResolvedTable {
    /// `"schema"."table"`
    pub fn quoted(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.schema),
            quote_identifier(&self.name)
        )
    }
}

impl fmt::Display for ResolvedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Request to build an index concurrently.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IndexSpec {
    /// Table name, optionally schema-qualified
    pub table_name: String,
    /// Columns in index key order
    pub columns: Vec<String>,
    /// Index name; derived from table and columns when absent
    #[serde(default)]
    pub index_name: Option<String>,
}

/// An [`IndexSpec`] whose identifiers passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIndex {
    pub table: TableRef,
    pub columns: Vec<String>,
    pub index_name: String,
}

impl IndexSpec {
    pub fn new<I, S>(table_name: impl Into<String>, columns: I, index_name: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table_name: table_name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            index_name,
        }
    }

    /// Split a comma-separated column list (`"customer_id, created_at"`).
    pub fn parse_columns(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Check identifiers and settle the index name.
    pub fn validate(&self) -> DbResult<ValidatedIndex> {
        let table = TableRef::parse(&self.table_name)?;

        if self.columns.is_empty() {
            return Err(DbError::invalid_input("at least one column is required"));
        }
        let mut columns: Vec<String> = Vec::with_capacity(self.columns.len());
        for raw in &self.columns {
            let column = normalize_identifier("column", raw)?;
            if columns.contains(&column) {
                return Err(DbError::invalid_input(format!(
                    "column '{column}' is listed more than once"
                )));
            }
            columns.push(column);
        }

        let index_name = match self.index_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => normalize_identifier("index", name)?,
            _ => derive_index_name(&table.name, &columns),
        };

        Ok(ValidatedIndex {
            table,
            columns,
            index_name,
        })
    }
}

/// `idx_{table}_{col1}_{col2}...`, cut to the identifier length limit.
pub fn derive_index_name(table: &str, columns: &[String]) -> String {
    let mut name = format!("idx_{}_{}", table, columns.join("_"));
    name.truncate(MAX_IDENTIFIER_LEN);
    name
}

/// Maintenance operation recorded in a [`MutationReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    CreateIndexConcurrently,
    Analyze,
    Vacuum,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateIndexConcurrently => "create_index_concurrently",
            Self::Analyze => "analyze",
            Self::Vacuum => "vacuum",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report of one Validate -> Execute -> Verify run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MutationReport {
    pub status: super::Status,
    pub operation: MutationKind,
    /// Table acted on; `None` for database-wide ANALYZE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_executed: Option<String>,
    pub duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_definition: Option<String>,
    /// Whether the post-execution catalog check confirmed the outcome
    pub verified: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl MutationReport {
    pub fn success(operation: MutationKind, message: impl Into<String>) -> Self {
        Self {
            status: super::Status::Success,
            operation,
            target: None,
            sql_executed: None,
            duration_seconds: 0.0,
            index_name: None,
            index_definition: None,
            verified: false,
            message: message.into(),
            error: None,
            error_kind: None,
            suggestion: None,
        }
    }

    pub fn failure(operation: MutationKind, err: &DbError) -> Self {
        Self {
            status: super::Status::Error,
            operation,
            target: None,
            sql_executed: None,
            duration_seconds: 0.0,
            index_name: None,
            index_definition: None,
            verified: false,
            message: format!("{} failed", operation),
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
            suggestion: err.suggestion().map(str::to_string),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == super::Status::Success
    }
}

/// Outcome of the static SQL safety classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SafetyVerdict {
    pub valid: bool,
    pub reason: String,
    /// Keyword that decided the verdict, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<String>,
    /// Advisory parser findings; never change `valid`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identifier_folds_case() {
        assert_eq!(normalize_identifier("table", "Orders").unwrap(), "orders");
        assert_eq!(normalize_identifier("table", "  line_items ").unwrap(), "line_items");
        assert_eq!(normalize_identifier("column", "amount$usd").unwrap(), "amount$usd");
    }

    #[test]
    fn test_normalize_identifier_rejects_injection() {
        for bad in ["", "1abc", "a b", "a;drop", "t\"x", "a-b", "naïve"] {
            let err = normalize_identifier("table", bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{bad}");
        }
    }

    #[test]
    fn test_normalize_identifier_length_limit() {
        let ok = "a".repeat(MAX_IDENTIFIER_LEN);
        assert!(normalize_identifier("index", &ok).is_ok());
        let too_long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(normalize_identifier("index", &too_long).is_err());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("orders"), "\"orders\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_table_ref_parse() {
        let t = TableRef::parse("orders").unwrap();
        assert_eq!(t.schema, None);
        assert_eq!(t.name, "orders");

        let t = TableRef::parse("Sales.Orders").unwrap();
        assert_eq!(t.schema.as_deref(), Some("sales"));
        assert_eq!(t.to_string(), "sales.orders");

        assert!(TableRef::parse("a.b.c").is_err());
        assert!(TableRef::parse(".orders").is_err());
    }

    #[test]
    fn test_resolved_table_quoted() {
        let t = ResolvedTable {
            schema: "public".into(),
            name: "orders".into(),
        };
        assert_eq!(t.quoted(), "\"public\".\"orders\"");
    }

    #[test]
    fn test_parse_columns() {
        assert_eq!(
            IndexSpec::parse_columns("customer_id, created_at ,"),
            vec!["customer_id", "created_at"]
        );
        assert!(IndexSpec::parse_columns(" , ").is_empty());
    }

    #[test]
    fn test_validate_derives_name() {
        let spec = IndexSpec::new("orders", ["customer_id", "created_at"], None);
        let v = spec.validate().unwrap();
        assert_eq!(v.index_name, "idx_orders_customer_id_created_at");
        assert_eq!(v.columns, vec!["customer_id", "created_at"]);
    }

    #[test]
    fn test_validate_blank_name_is_derived() {
        let spec = IndexSpec::new("orders", ["status"], Some("  ".into()));
        assert_eq!(spec.validate().unwrap().index_name, "idx_orders_status");
    }

    #[test]
    fn test_validate_uses_explicit_name() {
        let spec = IndexSpec::new("public.orders", ["status"], Some("Orders_Status_Idx".into()));
        let v = spec.validate().unwrap();
        assert_eq!(v.index_name, "orders_status_idx");
        assert_eq!(v.table.schema.as_deref(), Some("public"));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let no_columns = IndexSpec::new("orders", Vec::<String>::new(), None);
        assert!(no_columns.validate().is_err());

        let duplicate = IndexSpec::new("orders", ["a", "A"], None);
        assert!(duplicate.validate().is_err());

        let expression = IndexSpec::new("orders", ["lower(email)"], None);
        assert!(expression.validate().is_err());
    }

    #[test]
    fn test_derived_name_truncated() {
        let columns = vec![
            "a_really_long_column_name".to_string(),
            "another_really_long_column_name".to_string(),
        ];
        let name = derive_index_name("customer_order_history", &columns);
        assert_eq!(name.len(), MAX_IDENTIFIER_LEN);
        assert!(name.starts_with("idx_customer_order_history_a_really_long"));
    }

    #[test]
    fn test_mutation_report_failure() {
        let report =
            MutationReport::failure(MutationKind::Vacuum, &DbError::table_not_found("ghost"));
        assert!(!report.is_success());
        assert_eq!(report.error_kind, Some(ErrorKind::TableNotFound));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["operation"], "vacuum");
        assert_eq!(json["status"], "error");
    }
}
