//! Read-only diagnostic query catalog.
//!
//! Each [`Diagnostic`] is a fixed SQL statement over the PostgreSQL statistics
//! views. [`DiagnosticCatalog::run`] opens a read-only session, runs the
//! statement, closes the session and returns a tagged [`QueryResult`]. Errors
//! never escape: a failed run is a result with `status: error`.

pub mod queries;

use crate::db::{ConnectionProvider, SqlSession};
use crate::error::{DbError, DbResult};
use crate::models::{AccessMode, QueryResult, QueryRows};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info, warn};

const BLOAT_NOTE: &str =
    "Bloat figures are statistical estimates; confirm with pgstattuple before acting on them";

const STATEMENT_STATS_HINT: &str = "Enable it with CREATE EXTENSION pg_stat_statements; \
     the library must also be listed in shared_preload_libraries";

/// Every read-only query the catalog can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Diagnostic {
    LargestTables,
    DuplicateIndexes,
    UnusedIndexes,
    TableBloat,
    IndexBloat,
    DeadTuples,
    SlowQueries,
    TopQueries,
    BlockingQueries,
    ActiveSessions,
    TableStats,
    IndexUsage,
    MissingIndexCandidates,
    BufferCacheHitRatio,
    WaitEvents,
    ConnectionsByApplication,
    Schemas,
    Tables,
    ServerInfo,
}

impl Diagnostic {
    pub const ALL: [Diagnostic; 19] = [
        Diagnostic::LargestTables,
        Diagnostic::DuplicateIndexes,
        Diagnostic::UnusedIndexes,
        Diagnostic::TableBloat,
        Diagnostic::IndexBloat,
        Diagnostic::DeadTuples,
        Diagnostic::SlowQueries,
        Diagnostic::TopQueries,
        Diagnostic::BlockingQueries,
        Diagnostic::ActiveSessions,
        Diagnostic::TableStats,
        Diagnostic::IndexUsage,
        Diagnostic::MissingIndexCandidates,
        Diagnostic::BufferCacheHitRatio,
        Diagnostic::WaitEvents,
        Diagnostic::ConnectionsByApplication,
        Diagnostic::Schemas,
        Diagnostic::Tables,
        Diagnostic::ServerInfo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Diagnostic::LargestTables => "largest_tables",
            Diagnostic::DuplicateIndexes => "duplicate_indexes",
            Diagnostic::UnusedIndexes => "unused_indexes",
            Diagnostic::TableBloat => "table_bloat",
            Diagnostic::IndexBloat => "index_bloat",
            Diagnostic::DeadTuples => "dead_tuples",
            Diagnostic::SlowQueries => "slow_queries",
            Diagnostic::TopQueries => "top_queries",
            Diagnostic::BlockingQueries => "blocking_queries",
            Diagnostic::ActiveSessions => "active_sessions",
            Diagnostic::TableStats => "table_stats",
            Diagnostic::IndexUsage => "index_usage",
            Diagnostic::MissingIndexCandidates => "missing_index_candidates",
            Diagnostic::BufferCacheHitRatio => "buffer_cache_hit_ratio",
            Diagnostic::WaitEvents => "wait_events",
            Diagnostic::ConnectionsByApplication => "connections_by_application",
            Diagnostic::Schemas => "schemas",
            Diagnostic::Tables => "tables",
            Diagnostic::ServerInfo => "server_info",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Diagnostic::LargestTables => {
                "Top 20 tables by total size, split into heap, index and TOAST"
            }
            Diagnostic::DuplicateIndexes => {
                "Indexes on the same table with identical columns, opclasses and predicate"
            }
            Diagnostic::UnusedIndexes => {
                "Never-scanned indexes larger than 10 kB, excluding primary keys"
            }
            Diagnostic::TableBloat => "Estimated table bloat above the reporting thresholds",
            Diagnostic::IndexBloat => "Estimated index bloat from size and read activity",
            Diagnostic::DeadTuples => "Tables with more than 1000 dead tuples",
            Diagnostic::SlowQueries => {
                "Statements with mean execution time above 100 ms (pg_stat_statements)"
            }
            Diagnostic::TopQueries => {
                "Top 10 statements by total execution time with cache hit ratio (pg_stat_statements)"
            }
            Diagnostic::BlockingQueries => "Sessions waiting on locks and the sessions holding them",
            Diagnostic::ActiveSessions => "Non-idle sessions with wait state and running time",
            Diagnostic::TableStats => "Sequential versus index scan counts per table",
            Diagnostic::IndexUsage => "Least-used indexes with tuple read counts",
            Diagnostic::MissingIndexCandidates => {
                "Tables scanned sequentially more often than by index"
            }
            Diagnostic::BufferCacheHitRatio => "Heap block cache hit ratio across user tables",
            Diagnostic::WaitEvents => "Active sessions grouped by wait event",
            Diagnostic::ConnectionsByApplication => "Client connections grouped by application",
            Diagnostic::Schemas => "User schemas",
            Diagnostic::Tables => "User tables and views",
            Diagnostic::ServerInfo => "Server version, database and current user",
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Diagnostic::LargestTables => queries::LARGEST_TABLES,
            Diagnostic::DuplicateIndexes => queries::DUPLICATE_INDEXES,
            Diagnostic::UnusedIndexes => queries::UNUSED_INDEXES,
            Diagnostic::TableBloat => queries::TABLE_BLOAT,
            Diagnostic::IndexBloat => queries::INDEX_BLOAT,
            Diagnostic::DeadTuples => queries::DEAD_TUPLES,
            Diagnostic::SlowQueries => queries::SLOW_QUERIES,
            Diagnostic::TopQueries => queries::TOP_QUERIES,
            Diagnostic::BlockingQueries => queries::BLOCKING_QUERIES,
            Diagnostic::ActiveSessions => queries::ACTIVE_SESSIONS,
            Diagnostic::TableStats => queries::TABLE_STATS,
            Diagnostic::IndexUsage => queries::INDEX_USAGE,
            Diagnostic::MissingIndexCandidates => queries::MISSING_INDEX_CANDIDATES,
            Diagnostic::BufferCacheHitRatio => queries::BUFFER_CACHE_HIT_RATIO,
            Diagnostic::WaitEvents => queries::WAIT_EVENTS,
            Diagnostic::ConnectionsByApplication => queries::CONNECTIONS_BY_APPLICATION,
            Diagnostic::Schemas => queries::SCHEMAS,
            Diagnostic::Tables => queries::TABLES,
            Diagnostic::ServerInfo => queries::SERVER_INFO,
        }
    }

    /// Extension that must be installed before the query can run.
    pub fn required_extension(&self) -> Option<&'static str> {
        match self {
            Diagnostic::SlowQueries | Diagnostic::TopQueries => {
                Some(queries::STATEMENT_STATS_EXTENSION)
            }
            _ => None,
        }
    }

    /// Caveat attached to successful results.
    pub fn note(&self) -> Option<&'static str> {
        match self {
            Diagnostic::TableBloat | Diagnostic::IndexBloat => Some(BLOAT_NOTE),
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Diagnostic {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Diagnostic::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| {
                DbError::invalid_input(format!(
                    "Unknown diagnostic '{}'. Available: {}",
                    s,
                    Diagnostic::ALL.map(|d| d.name()).join(", ")
                ))
            })
    }
}

/// Catalog entry as listed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagnosticInfo {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_extension: Option<String>,
}

impl From<Diagnostic> for DiagnosticInfo {
    fn from(d: Diagnostic) -> Self {
        Self {
            name: d.name().to_string(),
            description: d.description().to_string(),
            requires_extension: d.required_extension().map(str::to_string),
        }
    }
}

/// Runs catalog queries through a [`ConnectionProvider`].
#[derive(Debug, Clone)]
pub struct DiagnosticCatalog<P> {
    provider: P,
}

impl<P: ConnectionProvider> DiagnosticCatalog<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Catalog entries, in display order.
    pub fn list(&self) -> Vec<DiagnosticInfo> {
        Diagnostic::ALL.into_iter().map(DiagnosticInfo::from).collect()
    }

    /// Run one diagnostic in its own read-only session.
    pub async fn run(&self, diagnostic: Diagnostic) -> QueryResult {
        let start = Instant::now();
        let outcome = self.try_run(diagnostic).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(rows) => {
                info!(
                    diagnostic = %diagnostic,
                    rows = rows.len(),
                    elapsed_ms,
                    "Diagnostic completed"
                );
                QueryResult::success(diagnostic.name(), rows, elapsed_ms)
                    .with_note(diagnostic.note())
            }
            Err(e) => {
                warn!(
                    diagnostic = %diagnostic,
                    error = %e,
                    elapsed_ms,
                    "Diagnostic failed"
                );
                QueryResult::failure(diagnostic.name(), &e, elapsed_ms)
            }
        }
    }

    async fn try_run(&self, diagnostic: Diagnostic) -> DbResult<QueryRows> {
        let mut session = self.provider.connect(AccessMode::ReadOnly).await?;
        let result = run_on_session(&mut session, diagnostic).await;
        session.close().await;
        result
    }

    pub async fn largest_tables(&self) -> QueryResult {
        self.run(Diagnostic::LargestTables).await
    }

    pub async fn unused_indexes(&self) -> QueryResult {
        self.run(Diagnostic::UnusedIndexes).await
    }

    pub async fn table_bloat(&self) -> QueryResult {
        self.run(Diagnostic::TableBloat).await
    }

    pub async fn index_bloat(&self) -> QueryResult {
        self.run(Diagnostic::IndexBloat).await
    }

    pub async fn slow_queries(&self) -> QueryResult {
        self.run(Diagnostic::SlowQueries).await
    }

    pub async fn top_queries(&self) -> QueryResult {
        self.run(Diagnostic::TopQueries).await
    }

    pub async fn blocking_queries(&self) -> QueryResult {
        self.run(Diagnostic::BlockingQueries).await
    }
}

async fn run_on_session<S: SqlSession>(
    session: &mut S,
    diagnostic: Diagnostic,
) -> DbResult<QueryRows> {
    if let Some(extension) = diagnostic.required_extension() {
        let installed = session
            .query(queries::EXTENSION_INSTALLED, &[extension])
            .await?;
        if installed.is_empty() {
            return Err(DbError::extension_unavailable(
                extension,
                STATEMENT_STATS_HINT,
            ));
        }
        debug!(
            extension,
            version = installed.first_str("version").unwrap_or("unknown"),
            "Required extension present"
        );
    }
    session.query(diagnostic.sql(), &[]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique_and_round_trip() {
        let names: HashSet<_> = Diagnostic::ALL.iter().map(|d| d.name()).collect();
        assert_eq!(names.len(), Diagnostic::ALL.len());
        for d in Diagnostic::ALL {
            assert_eq!(d.name().parse::<Diagnostic>().unwrap(), d);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            " Slow_Queries ".parse::<Diagnostic>().unwrap(),
            Diagnostic::SlowQueries
        );
    }

    #[test]
    fn test_unknown_name_lists_available() {
        let err = "vacuum_everything".parse::<Diagnostic>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("vacuum_everything"));
        assert!(msg.contains("largest_tables"));
    }

    #[test]
    fn test_serde_name_matches_name() {
        for d in Diagnostic::ALL {
            assert_eq!(serde_json::to_value(d).unwrap(), d.name());
        }
    }

    #[test]
    fn test_only_statement_queries_need_extension() {
        let needing: Vec<_> = Diagnostic::ALL
            .into_iter()
            .filter(|d| d.required_extension().is_some())
            .collect();
        assert_eq!(needing, vec![Diagnostic::SlowQueries, Diagnostic::TopQueries]);
    }

    #[test]
    fn test_bloat_results_carry_note() {
        assert!(Diagnostic::TableBloat.note().is_some());
        assert!(Diagnostic::IndexBloat.note().is_some());
        assert!(Diagnostic::LargestTables.note().is_none());
    }

    #[test]
    fn test_catalog_sql_is_read_only() {
        for d in Diagnostic::ALL {
            let upper = d.sql().to_uppercase();
            for keyword in ["INSERT ", "UPDATE ", "DELETE ", "DROP ", "ALTER ", "TRUNCATE "] {
                assert!(!upper.contains(keyword), "{} contains {}", d, keyword);
            }
        }
    }
}
