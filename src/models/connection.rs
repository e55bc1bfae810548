//! Connection-related data models.
//!
//! This module defines the resolved database connection configuration and the
//! session access mode.

use serde::Serialize;
use std::fmt;

pub const DEFAULT_PG_PORT: u16 = 5432;
pub const DEFAULT_PG_DATABASE: &str = "postgres";

/// Resolved configuration for the target database.
///
/// Loaded once at startup and shared read-only afterwards.
#[derive(Clone, Serialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub password: String,
    /// Aurora cluster identifier, used for CloudWatch cluster dimensions
    pub cluster_identifier: Option<String>,
    /// Aurora instance identifier, used for CloudWatch instance dimensions
    pub instance_identifier: Option<String>,
}

impl ConnectionConfig {
    /// Create a configuration with default port and no AWS identifiers.
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PG_PORT,
            database: database.into(),
            user: user.into(),
            password: password.into(),
            cluster_identifier: None,
            instance_identifier: None,
        }
    }

    /// Display-safe target description, e.g. `app@db.example.com:5432/orders`.
    pub fn display_target(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"****")
            .field("cluster_identifier", &self.cluster_identifier)
            .field("instance_identifier", &self.instance_identifier)
            .finish()
    }
}

/// Session access mode requested from a connection provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// `default_transaction_read_only = on` for the whole session
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "read-only"),
            Self::ReadWrite => write!(f, "read-write"),
        }
    }
}
