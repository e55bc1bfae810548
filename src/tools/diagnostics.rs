//! Diagnostic query tools.

use crate::db::ConnectionProvider;
use crate::diagnostics::{Diagnostic, DiagnosticCatalog, DiagnosticInfo};
use crate::error::DbResult;
use crate::models::QueryResult;
use crate::tools::format::{OutputFormat, apply_format};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input shared by the fixed diagnostic tools.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DiagnosticInput {
    /// Output format: "json" returns structured rows, "table" returns an ASCII table, "markdown" returns a markdown table
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RunDiagnosticInput {
    /// Diagnostic name from list_diagnostics (e.g. "dead_tuples")
    pub name: String,
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListDiagnosticsOutput {
    pub diagnostics: Vec<DiagnosticInfo>,
    pub count: usize,
}

pub struct DiagnosticToolHandler<P> {
    catalog: Arc<DiagnosticCatalog<P>>,
}

impl<P: ConnectionProvider> DiagnosticToolHandler<P> {
    pub fn new(catalog: Arc<DiagnosticCatalog<P>>) -> Self {
        Self { catalog }
    }

    pub fn list(&self) -> ListDiagnosticsOutput {
        let diagnostics = self.catalog.list();
        let count = diagnostics.len();
        ListDiagnosticsOutput { diagnostics, count }
    }

    pub async fn run(&self, diagnostic: Diagnostic, input: DiagnosticInput) -> QueryResult {
        apply_format(self.catalog.run(diagnostic).await, input.format)
    }

    /// Run by name; an unknown name is an input error, not a result.
    pub async fn run_named(&self, input: RunDiagnosticInput) -> DbResult<QueryResult> {
        let diagnostic: Diagnostic = input.name.parse()?;
        Ok(apply_format(self.catalog.run(diagnostic).await, input.format))
    }
}
