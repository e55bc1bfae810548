//! Error types for the DBOps MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Library operations never let a `DbError` escape to the caller: every public
//! diagnostic, mutation and monitoring call folds it into a tagged result with
//! an [`ErrorKind`], so tool callers always receive something renderable.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Table not found: {table}")]
    TableNotFound { table: String },

    #[error("Index name already in use: {index} is an existing {relation} in schema {schema}")]
    IndexAlreadyExists {
        index: String,
        schema: String,
        relation: String,
    },

    #[error("Extension not available: {extension}. {hint}")]
    ExtensionUnavailable { extension: String, hint: String },

    #[error("Mutation failed: {operation} - {message}")]
    Mutation { operation: String, message: String },

    #[error("Query failed: {message}")]
    Query {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Stable, serializable error category carried in every failed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ErrorKind {
    ConfigError,
    ConnectionError,
    TableNotFound,
    IndexAlreadyExists,
    ExtensionUnavailable,
    MutationError,
    QueryError,
    InvalidInput,
    Internal,
}

impl DbError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    pub fn index_already_exists(index: impl Into<String>, schema: impl Into<String>) -> Self {
        Self::name_in_use(index, schema, "index")
    }

    /// The index name collides with another relation (table, view, sequence...).
    pub fn name_in_use(
        index: impl Into<String>,
        schema: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self::IndexAlreadyExists {
            index: index.into(),
            schema: schema.into(),
            relation: relation.into(),
        }
    }

    /// Create an extension-unavailable error with an enablement hint.
    pub fn extension_unavailable(extension: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::ExtensionUnavailable {
            extension: extension.into(),
            hint: hint.into(),
        }
    }

    /// Create a mutation error (the statement ran but the outcome is wrong).
    pub fn mutation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mutation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a query error with optional SQL state.
    pub fn query(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Query {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Category of this error, as reported in tagged results.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::ConfigError,
            Self::Connection { .. } => ErrorKind::ConnectionError,
            Self::TableNotFound { .. } => ErrorKind::TableNotFound,
            Self::IndexAlreadyExists { .. } => ErrorKind::IndexAlreadyExists,
            Self::ExtensionUnavailable { .. } => ErrorKind::ExtensionUnavailable,
            Self::Mutation { .. } => ErrorKind::MutationError,
            Self::Query { .. } => ErrorKind::QueryError,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Query { suggestion, .. } => Some(suggestion),
            Self::ExtensionUnavailable { hint, .. } => Some(hint),
            Self::TableNotFound { .. } => {
                Some("Check the table name and schema, or call run_diagnostic with 'tables'")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::config(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                let suggestion = sql_state_suggestion(code.as_deref());
                DbError::query(db_err.message(), code, suggestion)
            }
            sqlx::Error::RowNotFound => DbError::query(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out waiting for a database connection",
                "Check that the database accepts new connections",
            ),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Map a SQLSTATE code to an actionable hint.
fn sql_state_suggestion(code: Option<&str>) -> &'static str {
    match code {
        Some("42501") => "The database user lacks privileges for this statistics view or object",
        Some("25006") => "The session is read-only; this statement needs a read-write session",
        Some("57014") => "The statement was cancelled by statement_timeout; raise --query-timeout",
        Some("55000") => "The object is not in the required state; check extension preload settings",
        Some("42P01") | Some("42704") => "A referenced relation or object does not exist",
        _ => "Check the SQL and the referenced objects",
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            DbError::InvalidInput { .. } | DbError::Config { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }

            DbError::TableNotFound { .. } | DbError::ExtensionUnavailable { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), data)
            }

            DbError::IndexAlreadyExists { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }

            DbError::Query {
                message, sql_state, ..
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, data)
            }

            DbError::Connection { .. } | DbError::Mutation { .. } | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(DbError::config("x").kind(), ErrorKind::ConfigError);
        assert_eq!(DbError::table_not_found("t").kind(), ErrorKind::TableNotFound);
        assert_eq!(
            DbError::index_already_exists("idx", "public").kind(),
            ErrorKind::IndexAlreadyExists
        );
        let taken = DbError::name_in_use("idx_orders_status", "public", "table");
        assert_eq!(taken.kind(), ErrorKind::IndexAlreadyExists);
        assert!(taken.to_string().contains("existing table in schema public"));
        assert_eq!(
            DbError::extension_unavailable("pg_stat_statements", "enable it").kind(),
            ErrorKind::ExtensionUnavailable
        );
        assert_eq!(
            DbError::mutation("create index", "invalid").kind(),
            ErrorKind::MutationError
        );
        assert_eq!(DbError::query("bad", None, "s").kind(), ErrorKind::QueryError);
    }

    #[test]
    fn test_error_kind_serializes_as_taxonomy_name() {
        let json = serde_json::to_value(ErrorKind::ExtensionUnavailable).unwrap();
        assert_eq!(json, "ExtensionUnavailable");
        let json = serde_json::to_value(ErrorKind::MutationError).unwrap();
        assert_eq!(json, "MutationError");
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::query("Syntax error", Some("42601".to_string()), "Check SQL syntax");
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
    }

    #[test]
    fn test_sql_state_suggestion() {
        assert!(sql_state_suggestion(Some("57014")).contains("statement_timeout"));
        assert!(sql_state_suggestion(Some("25006")).contains("read-only"));
        assert_eq!(
            sql_state_suggestion(None),
            "Check the SQL and the referenced objects"
        );
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::connection("err", "sugg").is_retryable());
        assert!(!DbError::table_not_found("orders").is_retryable());
    }

    #[test]
    fn test_invalid_input_maps_to_invalid_params() {
        let mcp_err: rmcp::ErrorData = DbError::invalid_input("bad input").into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_table_not_found_maps_to_resource_not_found() {
        let mcp_err: rmcp::ErrorData = DbError::table_not_found("orders").into();
        assert_eq!(mcp_err.code.0, -32002);
        assert!(mcp_err.data.is_some());
    }

    #[test]
    fn test_extension_unavailable_maps_to_resource_not_found() {
        let err = DbError::extension_unavailable("pg_stat_statements", "CREATE EXTENSION");
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32002);
        assert_eq!(mcp_err.data.unwrap()["suggestion"], "CREATE EXTENSION");
    }

    #[test]
    fn test_mutation_maps_to_internal_error() {
        let mcp_err: rmcp::ErrorData = DbError::mutation("create index", "invalid").into();
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_query_error_includes_sql_state() {
        let err = DbError::query("syntax error", Some("42601".to_string()), "check syntax");
        let mcp_err: rmcp::ErrorData = err.into();
        assert!(mcp_err.message.contains("42601"));
        assert_eq!(mcp_err.data.unwrap()["suggestion"], "check syntax");
    }

    #[test]
    fn test_connection_error_includes_suggestion_in_data() {
        let mcp_err: rmcp::ErrorData = DbError::connection("failed", "try reconnecting").into();
        assert_eq!(mcp_err.code.0, -32603);
        assert_eq!(mcp_err.data.unwrap()["suggestion"], "try reconnecting");
    }
}
