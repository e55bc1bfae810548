//! Database credential resolution.
//!
//! Credentials come from a JSON secret (AWS Secrets Manager in production)
//! merged with explicit overrides. Overrides win over secret values; the port
//! and database name fall back to PostgreSQL defaults. Host, user and password
//! have no default.

use crate::aws::sdk_error;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, DEFAULT_PG_DATABASE, DEFAULT_PG_PORT};
use serde_json::{Map, Value as JsonValue};
use std::future::Future;
use tracing::info;

/// Source of secret strings keyed by secret id.
pub trait SecretStore: Send + Sync {
    fn fetch_secret(&self, secret_id: &str) -> impl Future<Output = DbResult<String>> + Send;
}

/// Secrets Manager backed store.
#[derive(Debug, Clone)]
pub struct AwsSecretStore {
    client: aws_sdk_secretsmanager::Client,
}

impl AwsSecretStore {
    pub fn new(sdk_config: &aws_types::SdkConfig) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(sdk_config),
        }
    }
}

impl SecretStore for AwsSecretStore {
    async fn fetch_secret(&self, secret_id: &str) -> DbResult<String> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| sdk_error("SecretsManager", "GetSecretValue", e))?;

        let secret = response.secret_string().ok_or_else(|| {
            DbError::config(format!(
                "Secret '{secret_id}' has no SecretString (binary secrets are not supported)"
            ))
        })?;
        info!(secret_id = %secret_id, "Retrieved database credentials from Secrets Manager");
        Ok(secret.to_string())
    }
}

/// Fixed secret, for local runs and tests.
#[derive(Debug, Clone)]
pub struct StaticSecretStore {
    secret: String,
}

impl StaticSecretStore {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl SecretStore for StaticSecretStore {
    async fn fetch_secret(&self, _secret_id: &str) -> DbResult<String> {
        Ok(self.secret.clone())
    }
}

/// Explicit connection settings that take precedence over the secret.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub cluster_identifier: Option<String>,
    pub instance_identifier: Option<String>,
}

/// Fetch the secret (when an id is given) and merge it with `overrides`.
pub async fn load_connection_config<S: SecretStore>(
    store: &S,
    secret_id: Option<&str>,
    overrides: &ConnectionOverrides,
) -> DbResult<ConnectionConfig> {
    let secret = match secret_id {
        Some(id) => Some(store.fetch_secret(id).await?),
        None => None,
    };
    resolve_connection_config(secret.as_deref(), overrides)
}

/// Merge a secret JSON document with overrides into a [`ConnectionConfig`].
///
/// # Example
///
/// ```
/// use dbops_mcp_server::db::secrets::{ConnectionOverrides, resolve_connection_config};
///
/// let secret = r#"{"host":"aurora.local","username":"admin","password":"pw","port":"5433"}"#;
/// let config = resolve_connection_config(Some(secret), &ConnectionOverrides::default()).unwrap();
/// assert_eq!(config.port, 5433);
/// assert_eq!(config.database, "postgres");
/// ```
pub fn resolve_connection_config(
    secret: Option<&str>,
    overrides: &ConnectionOverrides,
) -> DbResult<ConnectionConfig> {
    let fields = match secret {
        Some(raw) => parse_secret(raw)?,
        None => Map::new(),
    };

    let host = overrides.host.clone().or_else(|| secret_str(&fields, &["host"]));
    let user = overrides
        .user
        .clone()
        .or_else(|| secret_str(&fields, &["username", "user"]));
    let password = overrides
        .password
        .clone()
        .or_else(|| secret_str(&fields, &["password"]));

    let mut missing = Vec::new();
    if host.is_none() {
        missing.push("host");
    }
    if user.is_none() {
        missing.push("user");
    }
    if password.is_none() {
        missing.push("password");
    }
    let (Some(host), Some(user), Some(password)) = (host, user, password) else {
        return Err(DbError::config(format!(
            "Missing required database settings: {}",
            missing.join(", ")
        )));
    };

    let port = match overrides.port {
        Some(port) => port,
        None => secret_port(&fields)?.unwrap_or(DEFAULT_PG_PORT),
    };

    let database = overrides
        .database
        .clone()
        .or_else(|| secret_str(&fields, &["dbname", "database"]))
        .unwrap_or_else(|| DEFAULT_PG_DATABASE.to_string());

    Ok(ConnectionConfig {
        host,
        port,
        database,
        user,
        password,
        cluster_identifier: overrides
            .cluster_identifier
            .clone()
            .or_else(|| secret_str(&fields, &["dbClusterIdentifier"])),
        instance_identifier: overrides
            .instance_identifier
            .clone()
            .or_else(|| secret_str(&fields, &["dbInstanceIdentifier"])),
    })
}

fn parse_secret(raw: &str) -> DbResult<Map<String, JsonValue>> {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(_) => Err(DbError::config("Database secret must be a JSON object")),
        Err(e) => Err(DbError::config(format!(
            "Database secret is not valid JSON: {e}"
        ))),
    }
}

/// First non-empty string (or number) among `keys`.
fn secret_str(fields: &Map<String, JsonValue>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match fields.get(*key)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn secret_port(fields: &Map<String, JsonValue>) -> DbResult<Option<u16>> {
    let Some(raw) = secret_str(fields, &["port"]) else {
        return Ok(None);
    };
    raw.parse::<u16>()
        .map(Some)
        .map_err(|_| DbError::config(format!("Invalid port in database secret: '{raw}'")))
}
