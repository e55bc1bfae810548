//! Integration tests for the diagnostic catalog against an in-memory database.

mod common;

use common::{FakeDb, rows};
use dbops_mcp_server::diagnostics::queries::{SLOW_QUERIES, STATEMENT_STATS_EXTENSION, UNUSED_INDEXES};
use dbops_mcp_server::diagnostics::{Diagnostic, DiagnosticCatalog};
use dbops_mcp_server::error::ErrorKind;
use dbops_mcp_server::models::{AccessMode, Status};
use dbops_mcp_server::tools::{
    DiagnosticInput, DiagnosticToolHandler, OutputFormat, RunDiagnosticInput,
};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_every_diagnostic_succeeds_with_no_rows() {
    let db = FakeDb::new().with_extension(STATEMENT_STATS_EXTENSION);
    let catalog = DiagnosticCatalog::new(db.clone());

    for diagnostic in Diagnostic::ALL {
        let result = catalog.run(diagnostic).await;
        assert_eq!(result.status, Status::Success, "{diagnostic} failed: {:?}", result.error);
        assert!(result.rows.is_empty());
        assert_eq!(result.count, 0);
        assert_eq!(result.operation, diagnostic.name());
    }
}

#[tokio::test]
async fn test_diagnostics_only_open_read_only_sessions() {
    let db = FakeDb::new().with_extension(STATEMENT_STATS_EXTENSION);
    let catalog = DiagnosticCatalog::new(db.clone());

    for diagnostic in Diagnostic::ALL {
        catalog.run(diagnostic).await;
    }

    let modes = db.opened_modes();
    assert_eq!(modes.len(), Diagnostic::ALL.len());
    assert!(modes.iter().all(|m| *m == AccessMode::ReadOnly));
    assert_eq!(db.open_count(), db.close_count());
    assert!(db.executed().is_empty());
    assert!(db.statements().iter().all(|s| s.mode == AccessMode::ReadOnly));
}

#[tokio::test]
async fn test_slow_queries_without_extension() {
    let db = FakeDb::new();
    let catalog = DiagnosticCatalog::new(db.clone());

    let result = catalog.slow_queries().await;
    assert_eq!(result.status, Status::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::ExtensionUnavailable));
    assert!(result.error.unwrap().contains("pg_stat_statements"));
    assert!(result.rows.is_empty());

    // The statistics view is never touched when the extension is missing.
    assert!(db.statements().iter().all(|s| s.sql != SLOW_QUERIES));
    assert_eq!(db.open_count(), 1);
    assert_eq!(db.close_count(), 1);
}

#[tokio::test]
async fn test_top_queries_checks_extension_too() {
    let result = DiagnosticCatalog::new(FakeDb::new()).top_queries().await;
    assert_eq!(result.error_kind, Some(ErrorKind::ExtensionUnavailable));
}

#[tokio::test]
async fn test_unused_index_rows_are_returned_in_column_order() {
    let columns = [
        "schemaname",
        "table_name",
        "index_name",
        "index_size",
        "index_size_bytes",
        "index_scans",
        "is_unique",
    ];
    let db = FakeDb::new().with_rows(
        UNUSED_INDEXES,
        rows(
            &columns,
            vec![json!({
                "schemaname": "public",
                "table_name": "orders",
                "index_name": "idx_orders_legacy_code",
                "index_size": "16 kB",
                "index_size_bytes": 16384,
                "index_scans": 0,
                "is_unique": false
            })],
        ),
    );

    let result = DiagnosticCatalog::new(db).unused_indexes().await;
    assert_eq!(result.status, Status::Success);
    assert_eq!(result.count, 1);
    assert_eq!(result.columns, columns);
    let hits: Vec<_> = result
        .rows
        .iter()
        .filter(|r| r["index_name"] == "idx_orders_legacy_code")
        .collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["index_scans"], 0);
}

#[tokio::test]
async fn test_bloat_results_carry_estimate_note() {
    let catalog = DiagnosticCatalog::new(FakeDb::new());
    assert!(catalog.table_bloat().await.note.is_some());
    assert!(catalog.index_bloat().await.note.is_some());
    assert!(catalog.blocking_queries().await.note.is_none());
}

#[tokio::test]
async fn test_connection_failure_is_a_tagged_result() {
    let db = FakeDb::new().refusing_connections();
    let result = DiagnosticCatalog::new(db.clone()).largest_tables().await;

    assert_eq!(result.status, Status::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::ConnectionError));
    assert!(result.suggestion.is_some());
    assert_eq!(db.open_count(), 0);
}

#[tokio::test]
async fn test_tool_handler_formats_and_rejects_unknown_names() {
    let db = FakeDb::new().with_rows(
        UNUSED_INDEXES,
        rows(&["index_name"], vec![json!({"index_name": "idx_a"})]),
    );
    let handler = DiagnosticToolHandler::new(Arc::new(DiagnosticCatalog::new(db)));

    let table = handler
        .run(
            Diagnostic::UnusedIndexes,
            DiagnosticInput {
                format: OutputFormat::Table,
            },
        )
        .await;
    let text = table.formatted.unwrap();
    assert!(text.contains("| idx_a"));
    assert!(text.contains("(1 row)"));

    let listed = handler.list();
    assert_eq!(listed.count, Diagnostic::ALL.len());

    let unknown = handler
        .run_named(RunDiagnosticInput {
            name: "reindex_everything".into(),
            format: OutputFormat::Json,
        })
        .await;
    assert!(unknown.is_err());

    let known = handler
        .run_named(RunDiagnosticInput {
            name: "dead_tuples".into(),
            format: OutputFormat::Json,
        })
        .await
        .unwrap();
    assert_eq!(known.operation, "dead_tuples");
}
