//! Maintenance tools: concurrent index builds, ANALYZE, VACUUM and the SQL safety check.

use crate::actions::SafeMutationExecutor;
use crate::db::ConnectionProvider;
use crate::models::{IndexSpec, MutationReport, SafetyVerdict};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

/// Columns as a JSON array or a comma-separated string.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ColumnList {
    List(Vec<String>),
    Csv(String),
}

impl ColumnList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ColumnList::List(columns) => columns,
            ColumnList::Csv(list) => IndexSpec::parse_columns(&list),
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateIndexInput {
    /// Table name, optionally schema-qualified (e.g. "sales.orders")
    pub table_name: String,
    /// Columns in index key order, as an array or "col1, col2"
    pub columns: ColumnList,
    /// Index name. Default: idx_{table}_{columns}
    #[serde(default)]
    pub index_name: Option<String>,
}

impl From<CreateIndexInput> for IndexSpec {
    fn from(input: CreateIndexInput) -> Self {
        IndexSpec::new(input.table_name, input.columns.into_vec(), input.index_name)
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct AnalyzeInput {
    /// Table to analyze. Omit to analyze the whole database.
    #[serde(default)]
    pub table_name: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VacuumInput {
    /// Table name, optionally schema-qualified
    pub table_name: String,
    /// Run ANALYZE after VACUUM. Default: true
    #[serde(default = "default_true")]
    pub analyze: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ValidateSqlInput {
    /// SQL text to classify. It is never executed.
    pub sql: String,
}

pub struct MaintenanceToolHandler<P> {
    executor: Arc<SafeMutationExecutor<P>>,
}

impl<P: ConnectionProvider> MaintenanceToolHandler<P> {
    pub fn new(executor: Arc<SafeMutationExecutor<P>>) -> Self {
        Self { executor }
    }

    pub async fn create_index(&self, input: CreateIndexInput) -> MutationReport {
        let spec = IndexSpec::from(input);
        self.executor.create_index_concurrently(&spec).await
    }

    pub async fn analyze(&self, input: AnalyzeInput) -> MutationReport {
        self.executor.analyze_table(input.table_name.as_deref()).await
    }

    pub async fn vacuum(&self, input: VacuumInput) -> MutationReport {
        self.executor
            .vacuum_table(&input.table_name, input.analyze)
            .await
    }

    pub fn validate_sql(&self, input: ValidateSqlInput) -> SafetyVerdict {
        self.executor.validate_sql(&input.sql)
    }
}
