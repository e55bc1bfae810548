//! Database access layer.
//!
//! This module provides database access functionality:
//! - Credential resolution from a secret store plus overrides
//! - Single-use sessions with a session-level access mode
//! - PostgreSQL row to JSON type mappings

pub mod provider;
pub mod secrets;
pub mod types;

pub use provider::{
    ConnectionProvider, PgConnectionProvider, PgSession, SessionSettings, SqlSession,
};
pub use secrets::{
    AwsSecretStore, ConnectionOverrides, SecretStore, StaticSecretStore, load_connection_config,
    resolve_connection_config,
};
