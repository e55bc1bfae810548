//! Safe maintenance operations.
//!
//! Each operation walks `Validate -> Execute -> Verify -> Report` on a single
//! read-write session. Pre-checks run before any DDL, so a missing table or a
//! taken index name never reaches the server as a statement. Nothing is ever
//! dropped automatically: an invalid index left by a failed concurrent build is
//! reported, not cleaned up.

pub mod sql_safety;

pub use sql_safety::validate_sql;

use crate::db::{ConnectionProvider, SqlSession};
use crate::error::{DbError, DbResult};
use crate::models::{
    AccessMode, IndexSpec, MutationKind, MutationReport, ResolvedTable, SafetyVerdict, TableRef,
    ValidatedIndex, quote_identifier,
};
use std::time::Instant;
use tracing::{info, warn};

/// Schema of a table in an explicit schema. Bound with schema, table.
pub const TABLE_IN_SCHEMA: &str = r#"
SELECT n.nspname::text AS table_schema
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1::name
  AND c.relname = $2::name
  AND c.relkind IN ('r', 'p', 'm')
"#;

/// First schema on `search_path` holding the table. Bound with table.
pub const TABLE_ON_SEARCH_PATH: &str = r#"
SELECT n.nspname::text AS table_schema
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE c.relname = $1::name
  AND c.relkind IN ('r', 'p', 'm')
  AND n.nspname = ANY (current_schemas(false))
ORDER BY array_position(current_schemas(false), n.nspname)
LIMIT 1
"#;

/// Any relation already holding the name in the schema. Indexes share the
/// relation namespace with tables, views, sequences and the rest, so all of
/// `pg_class` is checked. Bound with schema, index name.
pub const RELATION_EXISTS: &str = r#"
SELECT c.relname::text AS relation_name,
       CASE c.relkind
           WHEN 'r' THEN 'table'
           WHEN 'p' THEN 'partitioned table'
           WHEN 'i' THEN 'index'
           WHEN 'I' THEN 'partitioned index'
           WHEN 'S' THEN 'sequence'
           WHEN 'v' THEN 'view'
           WHEN 'm' THEN 'materialized view'
           WHEN 'c' THEN 'composite type'
           WHEN 't' THEN 'TOAST table'
           WHEN 'f' THEN 'foreign table'
           ELSE 'relation'
       END AS relation_kind
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1::name
  AND c.relname = $2::name
"#;

/// Post-build check. Bound with schema, index name.
pub const INDEX_STATUS: &str = r#"
SELECT c.relname::text AS index_name,
       pg_get_indexdef(i.indexrelid) AS index_definition,
       i.indisvalid AS is_valid,
       pg_relation_size(i.indexrelid) AS index_bytes
FROM pg_index i
JOIN pg_class c ON c.oid = i.indexrelid
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1::name
  AND c.relname = $2::name
"#;

/// `CREATE INDEX CONCURRENTLY "idx" ON "schema"."table" ("c1", "c2")`
pub fn create_index_sql(index: &ValidatedIndex, table: &ResolvedTable) -> String {
    let columns: Vec<String> = index.columns.iter().map(|c| quote_identifier(c)).collect();
    format!(
        "CREATE INDEX CONCURRENTLY {} ON {} ({})",
        quote_identifier(&index.index_name),
        table.quoted(),
        columns.join(", ")
    )
}

/// `VACUUM` or `VACUUM ANALYZE` on one table. There is no FULL form.
pub fn vacuum_sql(table: &ResolvedTable, analyze_after: bool) -> String {
    if analyze_after {
        format!("VACUUM ANALYZE {}", table.quoted())
    } else {
        format!("VACUUM {}", table.quoted())
    }
}

pub fn analyze_sql(table: Option<&ResolvedTable>) -> String {
    match table {
        Some(t) => format!("ANALYZE {}", t.quoted()),
        None => "ANALYZE".to_string(),
    }
}

/// What an operation got as far as doing, kept for the report on failure.
#[derive(Debug, Default)]
struct Progress {
    target: Option<String>,
    sql: Option<String>,
    index_name: Option<String>,
}

#[derive(Debug)]
struct Completed {
    message: String,
    verified: bool,
    index_definition: Option<String>,
}

/// Runs maintenance statements through a [`ConnectionProvider`].
#[derive(Debug, Clone)]
pub struct SafeMutationExecutor<P> {
    provider: P,
}

impl<P: ConnectionProvider> SafeMutationExecutor<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Build an index without blocking writes, then confirm it is valid.
    pub async fn create_index_concurrently(&self, spec: &IndexSpec) -> MutationReport {
        let kind = MutationKind::CreateIndexConcurrently;
        let start = Instant::now();
        let mut progress = Progress::default();

        let outcome = match spec.validate() {
            Ok(index) => {
                progress.index_name = Some(index.index_name.clone());
                match self.provider.connect(AccessMode::ReadWrite).await {
                    Ok(mut session) => {
                        let result = build_index(&mut session, &index, &mut progress).await;
                        session.close().await;
                        result
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        report(kind, start, progress, outcome)
    }

    /// Refresh planner statistics for one table, or the whole database.
    pub async fn analyze_table(&self, table: Option<&str>) -> MutationReport {
        let kind = MutationKind::Analyze;
        let start = Instant::now();
        let mut progress = Progress::default();

        let parsed = match table.map(str::trim).filter(|t| !t.is_empty()) {
            Some(raw) => TableRef::parse(raw).map(Some),
            None => Ok(None),
        };
        let outcome = match parsed {
            Ok(table) => match self.provider.connect(AccessMode::ReadWrite).await {
                Ok(mut session) => {
                    let result = analyze_on(&mut session, table.as_ref(), &mut progress).await;
                    session.close().await;
                    result
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        report(kind, start, progress, outcome)
    }

    /// Plain (non-FULL) VACUUM, optionally followed by ANALYZE.
    pub async fn vacuum_table(&self, table: &str, analyze_after: bool) -> MutationReport {
        let kind = MutationKind::Vacuum;
        let start = Instant::now();
        let mut progress = Progress::default();

        let outcome = match TableRef::parse(table) {
            Ok(table) => match self.provider.connect(AccessMode::ReadWrite).await {
                Ok(mut session) => {
                    let result = vacuum_on(&mut session, &table, analyze_after, &mut progress).await;
                    session.close().await;
                    result
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        report(kind, start, progress, outcome)
    }

    /// Static safety check; never touches the database.
    pub fn validate_sql(&self, sql: &str) -> SafetyVerdict {
        validate_sql(sql)
    }
}

async fn resolve_table<S: SqlSession>(session: &mut S, table: &TableRef) -> DbResult<ResolvedTable> {
    let rows = match &table.schema {
        Some(schema) => {
            session
                .query(TABLE_IN_SCHEMA, &[schema.as_str(), table.name.as_str()])
                .await?
        }
        None => session.query(TABLE_ON_SEARCH_PATH, &[table.name.as_str()]).await?,
    };
    let schema = rows
        .first_str("table_schema")
        .ok_or_else(|| DbError::table_not_found(table.to_string()))?;
    Ok(ResolvedTable {
        schema: schema.to_string(),
        name: table.name.clone(),
    })
}

async fn build_index<S: SqlSession>(
    session: &mut S,
    index: &ValidatedIndex,
    progress: &mut Progress,
) -> DbResult<Completed> {
    // Validate
    let table = resolve_table(session, &index.table).await?;
    progress.target = Some(table.to_string());

    let existing = session
        .query(RELATION_EXISTS, &[table.schema.as_str(), index.index_name.as_str()])
        .await?;
    if !existing.is_empty() {
        return Err(DbError::name_in_use(
            &index.index_name,
            &table.schema,
            existing.first_str("relation_kind").unwrap_or("relation"),
        ));
    }

    // Execute
    let sql = create_index_sql(index, &table);
    progress.sql = Some(sql.clone());
    info!(table = %table, index = %index.index_name, sql = %sql, "Building index concurrently");

    if let Err(build_err) = session.execute(&sql).await {
        return Err(classify_build_failure(session, &table, &index.index_name, build_err).await);
    }

    // Verify
    let status = session
        .query(INDEX_STATUS, &[table.schema.as_str(), index.index_name.as_str()])
        .await?;
    if status.is_empty() {
        return Err(DbError::mutation(
            MutationKind::CreateIndexConcurrently.as_str(),
            format!(
                "index \"{}\" not found in schema \"{}\" after build",
                index.index_name, table.schema
            ),
        ));
    }
    if status.first_bool("is_valid") != Some(true) {
        return Err(DbError::mutation(
            MutationKind::CreateIndexConcurrently.as_str(),
            invalid_index_message(&table, &index.index_name),
        ));
    }

    let size = status
        .rows
        .first()
        .and_then(|row| row.get("index_bytes"))
        .and_then(|v| v.as_u64())
        .map(|bytes| humansize::format_size(bytes, humansize::WINDOWS))
        .unwrap_or_else(|| "unknown size".to_string());

    Ok(Completed {
        message: format!(
            "Index \"{}\" created on {} and verified valid ({})",
            index.index_name, table, size
        ),
        verified: true,
        index_definition: status.first_str("index_definition").map(str::to_string),
    })
}

/// A failed concurrent build can leave an INVALID index behind. That is a
/// mutation failure the operator has to clean up; anything else is the
/// server's error as-is.
async fn classify_build_failure<S: SqlSession>(
    session: &mut S,
    table: &ResolvedTable,
    index_name: &str,
    build_err: DbError,
) -> DbError {
    let leftover = session
        .query(INDEX_STATUS, &[table.schema.as_str(), index_name])
        .await;
    match leftover {
        Ok(rows) if rows.first_bool("is_valid") == Some(false) => DbError::mutation(
            MutationKind::CreateIndexConcurrently.as_str(),
            format!(
                "{}; build error: {}",
                invalid_index_message(table, index_name),
                build_err
            ),
        ),
        _ => build_err,
    }
}

fn invalid_index_message(table: &ResolvedTable, index_name: &str) -> String {
    format!(
        "index \"{}\" on {} is INVALID; drop it with DROP INDEX CONCURRENTLY \"{}\".\"{}\" before retrying",
        index_name, table, table.schema, index_name
    )
}

async fn analyze_on<S: SqlSession>(
    session: &mut S,
    table: Option<&TableRef>,
    progress: &mut Progress,
) -> DbResult<Completed> {
    let resolved = match table {
        Some(t) => Some(resolve_table(session, t).await?),
        None => None,
    };
    progress.target = resolved.as_ref().map(ToString::to_string);

    let sql = analyze_sql(resolved.as_ref());
    progress.sql = Some(sql.clone());
    info!(sql = %sql, "Running ANALYZE");
    session.execute(&sql).await?;

    let message = match &resolved {
        Some(t) => format!("Statistics updated for {t}"),
        None => "Statistics updated for all tables in the database".to_string(),
    };
    Ok(Completed {
        message,
        verified: false,
        index_definition: None,
    })
}

async fn vacuum_on<S: SqlSession>(
    session: &mut S,
    table: &TableRef,
    analyze_after: bool,
    progress: &mut Progress,
) -> DbResult<Completed> {
    let resolved = resolve_table(session, table).await?;
    progress.target = Some(resolved.to_string());

    let sql = vacuum_sql(&resolved, analyze_after);
    progress.sql = Some(sql.clone());
    info!(sql = %sql, "Running VACUUM");
    session.execute(&sql).await?;

    let message = if analyze_after {
        format!("Vacuumed and analyzed {resolved}")
    } else {
        format!("Vacuumed {resolved}")
    };
    Ok(Completed {
        message,
        verified: false,
        index_definition: None,
    })
}

fn report(
    kind: MutationKind,
    start: Instant,
    progress: Progress,
    outcome: DbResult<Completed>,
) -> MutationReport {
    let duration_seconds = (start.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;

    let mut report = match outcome {
        Ok(done) => {
            info!(
                operation = %kind,
                target = progress.target.as_deref().unwrap_or("database"),
                duration_seconds,
                verified = done.verified,
                "Maintenance operation completed"
            );
            let mut report = MutationReport::success(kind, done.message);
            report.verified = done.verified;
            report.index_definition = done.index_definition;
            report
        }
        Err(e) => {
            warn!(
                operation = %kind,
                target = progress.target.as_deref().unwrap_or("-"),
                error = %e,
                "Maintenance operation failed"
            );
            MutationReport::failure(kind, &e)
        }
    };
    report.target = progress.target;
    report.sql_executed = progress.sql;
    report.index_name = progress.index_name;
    report.duration_seconds = duration_seconds;
    report
}
