//! Connection provider and single-use sessions.
//!
//! Every operation opens its own session, uses it, and closes it. There is no
//! pool: a diagnostic call is one connect attempt, one or two statements, and
//! a close. Read paths ask for [`AccessMode::ReadOnly`], which the Postgres
//! provider enforces at the session level with
//! `default_transaction_read_only = on`.

use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{AccessMode, ConnectionConfig, QueryRows};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::{Column, Connection, Executor, Statement};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A live database session.
pub trait SqlSession: Send {
    /// Run a row-returning statement.
    ///
    /// With no `params` the statement goes over the simple query protocol.
    /// Parameters bind as text to `$1..$n`.
    fn query(
        &mut self,
        sql: &str,
        params: &[&str],
    ) -> impl Future<Output = DbResult<QueryRows>> + Send;

    /// Run a statement outside any explicit transaction and return rows affected.
    fn execute(&mut self, sql: &str) -> impl Future<Output = DbResult<u64>> + Send;

    /// Close the session. Failures are logged, never returned.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Produces sessions against the configured database.
pub trait ConnectionProvider: Send + Sync {
    type Session: SqlSession;

    fn connect(&self, mode: AccessMode) -> impl Future<Output = DbResult<Self::Session>> + Send;
}

/// Session-level settings applied to every Postgres connection.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub connect_timeout: Duration,
    /// Server-side `statement_timeout`; zero disables it
    pub statement_timeout: Duration,
    pub ssl_mode: PgSslMode,
    pub application_name: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(crate::config::DEFAULT_CONNECT_TIMEOUT_SECS),
            statement_timeout: Duration::from_secs(crate::config::DEFAULT_QUERY_TIMEOUT_SECS),
            ssl_mode: PgSslMode::Prefer,
            application_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// [`ConnectionProvider`] backed by a fresh sqlx `PgConnection` per session.
#[derive(Debug, Clone)]
pub struct PgConnectionProvider {
    config: Arc<ConnectionConfig>,
    settings: SessionSettings,
}

impl PgConnectionProvider {
    pub fn new(config: ConnectionConfig, settings: SessionSettings) -> Self {
        Self {
            config: Arc::new(config),
            settings,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Build connect options for `mode`.
    ///
    /// Read-write sessions carry maintenance statements (concurrent index
    /// builds, VACUUM) and run with `statement_timeout = 0`.
    pub fn connect_options(&self, mode: AccessMode) -> PgConnectOptions {
        let statement_timeout_ms = match mode {
            AccessMode::ReadOnly => self.settings.statement_timeout.as_millis().to_string(),
            AccessMode::ReadWrite => "0".to_string(),
        };
        let read_only = if mode.is_read_only() { "on" } else { "off" };

        PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(&self.config.database)
            .username(&self.config.user)
            .password(&self.config.password)
            .ssl_mode(self.settings.ssl_mode)
            .application_name(&self.settings.application_name)
            .options([
                ("default_transaction_read_only", read_only),
                ("statement_timeout", statement_timeout_ms.as_str()),
            ])
    }
}

impl ConnectionProvider for PgConnectionProvider {
    type Session = PgSession;

    async fn connect(&self, mode: AccessMode) -> DbResult<PgSession> {
        let options = self.connect_options(mode);
        let timeout = self.settings.connect_timeout;
        let start = Instant::now();

        let conn = match tokio::time::timeout(timeout, PgConnection::connect_with(&options)).await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                let suggestion = connection_suggestion(&e);
                warn!(
                    target_db = %self.config.display_target(),
                    error = %e,
                    "Database connection failed"
                );
                return Err(DbError::connection(
                    format!("Failed to connect to PostgreSQL: {}", e),
                    suggestion,
                ));
            }
            Err(_) => {
                return Err(DbError::connection(
                    format!(
                        "Connection to {} timed out after {}s",
                        self.config.display_target(),
                        timeout.as_secs()
                    ),
                    "Check that the host is reachable or raise --connect-timeout",
                ));
            }
        };

        debug!(
            target_db = %self.config.display_target(),
            mode = %mode,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Database session opened"
        );
        Ok(PgSession { conn, mode })
    }
}

/// One sqlx connection, tagged with the mode it was opened in.
#[derive(Debug)]
pub struct PgSession {
    conn: PgConnection,
    mode: AccessMode,
}

impl PgSession {
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Result columns of a statement that returned no rows, so empty results
    /// still render with a header.
    async fn describe_columns(&mut self, sql: &str) -> Vec<String> {
        match (&mut self.conn).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                debug!(error = %e, "Could not describe result columns");
                Vec::new()
            }
        }
    }
}

impl SqlSession for PgSession {
    async fn query(&mut self, sql: &str, params: &[&str]) -> DbResult<QueryRows> {
        let rows = if params.is_empty() {
            (&mut self.conn).fetch_all(sql).await?
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = query.bind(*param);
            }
            query.fetch_all(&mut self.conn).await?
        };

        let columns = match rows.first() {
            Some(row) => row.column_names(),
            None => self.describe_columns(sql).await,
        };
        let rows = rows.iter().map(|r| r.to_json_map()).collect();
        Ok(QueryRows::new(columns, rows))
    }

    async fn execute(&mut self, sql: &str) -> DbResult<u64> {
        let result = (&mut self.conn).execute(sql).await?;
        Ok(result.rows_affected())
    }

    async fn close(self) {
        if let Err(e) = self.conn.close().await {
            warn!(error = %e, "Error closing database session");
        }
    }
}

/// Heuristic hint for a failed connect attempt.
fn connection_suggestion(error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that the PostgreSQL server is running and accessible".to_string();
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify the username and password in the database secret".to_string();
    }

    if error_str.contains("does not exist") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration (--ssl-mode) and build features".to_string();
    }

    "Verify host, port and network access to the database".to_string()
}

/// Log a one-line connection check at startup.
pub async fn log_server_version<P: ConnectionProvider>(provider: &P) -> DbResult<String> {
    let mut session = provider.connect(AccessMode::ReadOnly).await?;
    let result = session.query("SELECT version() AS version", &[]).await;
    session.close().await;
    let version = result?
        .first_str("version")
        .unwrap_or("unknown")
        .to_string();
    info!(version = %version, "Connected to PostgreSQL");
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> PgConnectionProvider {
        let config = ConnectionConfig::new("db.internal", "orders", "app", "pw");
        PgConnectionProvider::new(config, SessionSettings::default())
    }

    #[test]
    fn test_connect_options_target() {
        let options = provider().connect_options(AccessMode::ReadOnly);
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_database(), Some("orders"));
        assert_eq!(options.get_username(), "app");
    }

    #[test]
    fn test_connect_options_read_only_flag() {
        let ro = provider().connect_options(AccessMode::ReadOnly);
        let opts = ro.get_options().unwrap_or_default();
        assert!(opts.contains("default_transaction_read_only=on"), "{opts}");

        let rw = provider().connect_options(AccessMode::ReadWrite);
        let opts = rw.get_options().unwrap_or_default();
        assert!(opts.contains("default_transaction_read_only=off"), "{opts}");
    }

    #[test]
    fn test_connect_options_statement_timeout() {
        let options = provider().connect_options(AccessMode::ReadOnly);
        let opts = options.get_options().unwrap_or_default();
        assert!(opts.contains("statement_timeout=30000"), "{opts}");

        let rw = provider().connect_options(AccessMode::ReadWrite);
        let opts = rw.get_options().unwrap_or_default();
        assert!(opts.contains("statement_timeout=0"), "{opts}");
    }

    #[test]
    fn test_provider_keeps_config() {
        assert_eq!(provider().config().database, "orders");
    }
}
