//! Tests against a real PostgreSQL server.
//!
//! Skipped unless `DBOPS_LIVE_TEST=1`. Connection details come from the usual
//! libpq variables (`PGHOST`, `PGPORT`, `PGDATABASE`, `PGUSER`, `PGPASSWORD`).
//! The user needs CREATE on the `public` schema.

use dbops_mcp_server::actions::SafeMutationExecutor;
use dbops_mcp_server::db::{ConnectionProvider, PgConnectionProvider, SessionSettings, SqlSession};
use dbops_mcp_server::diagnostics::DiagnosticCatalog;
use dbops_mcp_server::error::ErrorKind;
use dbops_mcp_server::models::{AccessMode, ConnectionConfig, IndexSpec, Status};

fn live_provider() -> Option<PgConnectionProvider> {
    if std::env::var("DBOPS_LIVE_TEST").ok().as_deref() != Some("1") {
        eprintln!("skipping: DBOPS_LIVE_TEST is not set");
        return None;
    }
    let var = |name: &str, default: &str| std::env::var(name).unwrap_or_else(|_| default.to_string());
    let mut config = ConnectionConfig::new(
        var("PGHOST", "localhost"),
        var("PGDATABASE", "postgres"),
        var("PGUSER", "postgres"),
        var("PGPASSWORD", "postgres"),
    );
    if let Some(port) = std::env::var("PGPORT").ok().and_then(|p| p.parse().ok()) {
        config.port = port;
    }
    Some(PgConnectionProvider::new(config, SessionSettings::default()))
}

fn scratch_table(label: &str) -> String {
    format!("dbops_live_{}_{}", label, std::process::id())
}

async fn exec(provider: &PgConnectionProvider, sql: &str) {
    let mut session = provider.connect(AccessMode::ReadWrite).await.unwrap();
    session.execute(sql).await.unwrap();
    session.close().await;
}

#[tokio::test]
async fn test_live_read_only_session_rejects_writes() {
    let Some(provider) = live_provider() else {
        return;
    };
    let mut session = provider.connect(AccessMode::ReadOnly).await.unwrap();
    let err = session
        .execute("CREATE TABLE dbops_live_should_not_exist (id int)")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueryError);
    session.close().await;
}

#[tokio::test]
async fn test_live_empty_result_keeps_columns() {
    let Some(provider) = live_provider() else {
        return;
    };
    let mut session = provider.connect(AccessMode::ReadOnly).await.unwrap();
    let plain = session
        .query("SELECT 1 AS one, 'x' AS letter WHERE false", &[])
        .await
        .unwrap();
    let bound = session
        .query("SELECT relname FROM pg_class WHERE relname = $1::name", &["dbops_no_such_relation"])
        .await
        .unwrap();
    session.close().await;

    assert!(plain.rows.is_empty());
    assert_eq!(plain.columns, vec!["one", "letter"]);
    assert!(bound.rows.is_empty());
    assert_eq!(bound.columns, vec!["relname"]);
}

#[tokio::test]
async fn test_live_unused_index_reported_once() {
    let Some(provider) = live_provider() else {
        return;
    };
    let table = scratch_table("unused");
    let index = format!("{table}_code");
    exec(&provider, &format!("DROP TABLE IF EXISTS {table}")).await;
    exec(
        &provider,
        &format!(
            "CREATE TABLE {table} AS SELECT g AS id, md5(g::text) AS code FROM generate_series(1, 2000) g"
        ),
    )
    .await;
    exec(&provider, &format!("ALTER TABLE {table} ADD PRIMARY KEY (id)")).await;
    exec(&provider, &format!("CREATE INDEX {index} ON {table} (code)")).await;

    let result = DiagnosticCatalog::new(provider.clone()).unused_indexes().await;
    exec(&provider, &format!("DROP TABLE {table}")).await;

    assert_eq!(result.status, Status::Success, "{:?}", result.error);
    let hits: Vec<_> = result
        .rows
        .iter()
        .filter(|r| r["index_name"] == index.as_str())
        .collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["index_scans"], 0);

    // The never-scanned primary key is larger than the size floor but excluded.
    let on_table: Vec<_> = result
        .rows
        .iter()
        .filter(|r| r["table_name"] == table.as_str())
        .map(|r| r["index_name"].clone())
        .collect();
    assert_eq!(on_table, vec![serde_json::json!(index)]);
}

#[tokio::test]
async fn test_live_index_name_taken_by_table() {
    let Some(provider) = live_provider() else {
        return;
    };
    let table = scratch_table("taken");
    let squatter = format!("idx_{table}_a");
    exec(&provider, &format!("DROP TABLE IF EXISTS {table}, {squatter}")).await;
    exec(&provider, &format!("CREATE TABLE {table} (a int)")).await;
    exec(&provider, &format!("CREATE TABLE {squatter} (b int)")).await;

    let report = SafeMutationExecutor::new(provider.clone())
        .create_index_concurrently(&IndexSpec::new(table.as_str(), ["a"], None))
        .await;
    exec(&provider, &format!("DROP TABLE {table}, {squatter}")).await;

    assert_eq!(report.error_kind, Some(ErrorKind::IndexAlreadyExists), "{:?}", report.error);
    assert!(report.sql_executed.is_none());
}

#[tokio::test]
async fn test_live_create_index_concurrently_twice() {
    let Some(provider) = live_provider() else {
        return;
    };
    let table = scratch_table("build");
    exec(&provider, &format!("DROP TABLE IF EXISTS {table}")).await;
    exec(
        &provider,
        &format!("CREATE TABLE {table} AS SELECT g AS id, g % 7 AS bucket FROM generate_series(1, 500) g"),
    )
    .await;

    let executor = SafeMutationExecutor::new(provider.clone());
    let spec = IndexSpec::new(table.as_str(), ["bucket"], None);
    let first = executor.create_index_concurrently(&spec).await;
    let second = executor.create_index_concurrently(&spec).await;
    let vacuum = executor.vacuum_table(&table, true).await;
    exec(&provider, &format!("DROP TABLE {table}")).await;

    assert!(first.is_success(), "{:?}", first.error);
    assert!(first.verified);
    assert_eq!(second.error_kind, Some(ErrorKind::IndexAlreadyExists));
    assert!(vacuum.is_success(), "{:?}", vacuum.error);
}

#[tokio::test]
async fn test_live_missing_table() {
    let Some(provider) = live_provider() else {
        return;
    };
    let report = SafeMutationExecutor::new(provider)
        .analyze_table(Some("dbops_live_table_that_does_not_exist"))
        .await;
    assert_eq!(report.error_kind, Some(ErrorKind::TableNotFound));
}

#[tokio::test]
async fn test_live_every_diagnostic_answers() {
    let Some(provider) = live_provider() else {
        return;
    };
    let catalog = DiagnosticCatalog::new(provider);
    for diagnostic in dbops_mcp_server::diagnostics::Diagnostic::ALL {
        let result = catalog.run(diagnostic).await;
        match result.status {
            Status::Success => {}
            Status::Error => assert_eq!(
                result.error_kind,
                Some(ErrorKind::ExtensionUnavailable),
                "{diagnostic}: {:?}",
                result.error
            ),
        }
    }
}
