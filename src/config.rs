//! Configuration handling for the dbops MCP server.
//!
//! All settings come from CLI arguments with environment variable fallbacks.
//! Database credentials are resolved later from the secret plus the explicit
//! `--db-*` overrides (see [`crate::db::secrets`]).

use crate::db::{ConnectionOverrides, SessionSettings};
use crate::notify::derive_topic_arn;
use clap::{Parser, ValueEnum};
use sqlx::postgres::PgSslMode;
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REGION: &str = "us-west-2";

// Environment names used by older deployments of the Aurora agents.
const LEGACY_HOST_ENV: &str = "DBENDP";
const LEGACY_DATABASE_ENV: &str = "DB_NAME";
const LEGACY_USER_ENV: &str = "DBUSER";
const LEGACY_PASSWORD_ENV: &str = "DBPASS";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for networked clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// libpq-style `sslmode` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SslMode {
    Disable,
    Allow,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl From<SslMode> for PgSslMode {
    fn from(mode: SslMode) -> Self {
        match mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Allow => PgSslMode::Allow,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
            SslMode::VerifyCa => PgSslMode::VerifyCa,
            SslMode::VerifyFull => PgSslMode::VerifyFull,
        }
    }
}

/// Configuration for the dbops MCP server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dbops-mcp-server",
    about = "MCP server for PostgreSQL diagnostics, safe maintenance and Aurora monitoring",
    version,
    author
)]
pub struct Config {
    /// Secrets Manager secret holding host/username/password (JSON)
    #[arg(long, value_name = "SECRET_ID", env = "AURORA_SECRET_ID")]
    pub secret_id: Option<String>,

    /// Inline secret JSON, used instead of Secrets Manager (local development)
    #[arg(long, value_name = "JSON", env = "DBOPS_SECRET_JSON", hide_env_values = true)]
    pub secret_json: Option<String>,

    /// AWS region for Secrets Manager, CloudWatch and SNS
    #[arg(long, default_value = DEFAULT_REGION, env = "AWS_REGION")]
    pub region: String,

    /// Database host (overrides the secret)
    #[arg(long, env = "PGHOST")]
    pub db_host: Option<String>,

    /// Database port (overrides the secret)
    #[arg(long, env = "PGPORT")]
    pub db_port: Option<u16>,

    /// Database name (overrides the secret)
    #[arg(long, env = "PGDATABASE")]
    pub db_name: Option<String>,

    /// Database user (overrides the secret)
    #[arg(long, env = "PGUSER")]
    pub db_user: Option<String>,

    /// Database password (overrides the secret)
    #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Aurora cluster identifier for CloudWatch dimensions
    #[arg(long, env = "DBOPS_CLUSTER_ID")]
    pub cluster_id: Option<String>,

    /// Aurora instance identifier for CloudWatch dimensions
    #[arg(long, env = "DBOPS_INSTANCE_ID")]
    pub instance_id: Option<String>,

    /// TLS mode for database connections
    #[arg(long, value_enum, default_value = "prefer", env = "PGSSLMODE")]
    pub ssl_mode: SslMode,

    /// SNS topic for send_notification
    #[arg(long, env = "DBOPS_SNS_TOPIC_ARN")]
    pub sns_topic_arn: Option<String>,

    /// AWS account id, used to derive the default SNS topic ARN
    #[arg(long, env = "AWS_ACCOUNT_ID")]
    pub aws_account_id: Option<String>,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "DBOPS_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "DBOPS_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "DBOPS_HTTP_PORT")]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(long, default_value = DEFAULT_MCP_ENDPOINT, env = "DBOPS_MCP_ENDPOINT")]
    pub mcp_endpoint: String,

    /// Server-side statement timeout for read-only sessions, in seconds (0 disables)
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "DBOPS_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "DBOPS_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "DBOPS_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DBOPS_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging output (disabled by default to avoid interfering with stdio transport)
    #[arg(long, env = "DBOPS_ENABLE_LOGS")]
    pub enable_logs: bool,

    /// Bearer tokens for HTTP transport.
    /// Can be specified multiple times or as comma-separated values.
    #[arg(
        long = "auth-token",
        value_name = "TOKEN",
        env = "DBOPS_AUTH_TOKENS",
        value_delimiter = ',',
        hide_env_values = true
    )]
    pub auth_tokens: Vec<String>,
}

impl Config {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            secret_id: None,
            secret_json: None,
            region: DEFAULT_REGION.to_string(),
            db_host: None,
            db_port: None,
            db_name: None,
            db_user: None,
            db_password: None,
            cluster_id: None,
            instance_id: None,
            ssl_mode: SslMode::Prefer,
            sns_topic_arn: None,
            aws_account_id: None,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
            enable_logs: false,
            auth_tokens: Vec::new(),
        }
    }

    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            connect_timeout: self.connect_timeout_duration(),
            statement_timeout: self.query_timeout_duration(),
            ssl_mode: self.ssl_mode.into(),
            ..SessionSettings::default()
        }
    }

    pub fn connection_overrides(&self) -> ConnectionOverrides {
        self.connection_overrides_from(|name| std::env::var(name).ok())
    }

    /// Overrides from the `--db-*` flags, falling back to legacy environment names.
    pub fn connection_overrides_from<F>(&self, env: F) -> ConnectionOverrides
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |value: &Option<String>, legacy: &str| {
            value
                .clone()
                .or_else(|| env(legacy))
                .filter(|v| !v.trim().is_empty())
        };
        ConnectionOverrides {
            host: pick(&self.db_host, LEGACY_HOST_ENV),
            port: self.db_port,
            database: pick(&self.db_name, LEGACY_DATABASE_ENV),
            user: pick(&self.db_user, LEGACY_USER_ENV),
            password: pick(&self.db_password, LEGACY_PASSWORD_ENV),
            cluster_identifier: self.cluster_id.clone(),
            instance_identifier: self.instance_id.clone(),
        }
    }

    /// Explicit topic ARN, else one derived from the account id and region.
    pub fn resolve_topic_arn(&self) -> Option<String> {
        self.sns_topic_arn
            .clone()
            .filter(|arn| !arn.trim().is_empty())
            .or_else(|| {
                self.aws_account_id
                    .as_deref()
                    .filter(|id| !id.trim().is_empty())
                    .map(|account| derive_topic_arn(&self.region, account.trim()))
            })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
