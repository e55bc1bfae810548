//! dbops MCP server entry point.
//!
//! Resolves database credentials, wires the diagnostic catalog, the safe
//! mutation executor, CloudWatch and SNS into one service and serves it over
//! stdio or HTTP.

use clap::Parser;
use dbops_mcp_server::auth::AuthConfig;
use dbops_mcp_server::aws::load_sdk_config;
use dbops_mcp_server::config::{Config, TransportMode};
use dbops_mcp_server::db::{
    AwsSecretStore, PgConnectionProvider, StaticSecretStore, load_connection_config,
};
use dbops_mcp_server::db::provider::log_server_version;
use dbops_mcp_server::mcp::ServiceContext;
use dbops_mcp_server::monitoring::{CloudWatchMonitoring, MetricsGateway};
use dbops_mcp_server::notify::{AlertNotifier, SnsPublisher};
use dbops_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logs go to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    if !config.enable_logs {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config);

    info!(
        transport = %config.transport,
        region = %config.region,
        "Starting dbops MCP server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let sdk_config = load_sdk_config(&config.region).await;
    let overrides = config.connection_overrides();

    let connection = match config.secret_json.as_deref() {
        Some(json) => {
            let store = StaticSecretStore::new(json);
            load_connection_config(&store, Some("inline"), &overrides).await?
        }
        None => {
            let store = AwsSecretStore::new(&sdk_config);
            load_connection_config(&store, config.secret_id.as_deref(), &overrides).await?
        }
    };
    info!(target_db = %connection.display_target(), "Resolved database connection");

    let cluster_id = connection.cluster_identifier.clone();
    let instance_id = connection.instance_identifier.clone();
    let provider = PgConnectionProvider::new(connection, config.session_settings());

    if let Err(e) = log_server_version(&provider).await {
        warn!(
            error = %e,
            "Database not reachable at startup; tools will report connection errors"
        );
    }

    let gateway = MetricsGateway::new(
        CloudWatchMonitoring::new(&sdk_config),
        cluster_id,
        instance_id,
    );
    let topic_arn = config.resolve_topic_arn();
    if topic_arn.is_none() {
        warn!("No SNS topic configured; send_notification will return a configuration error");
    }
    let notifier = AlertNotifier::new(SnsPublisher::new(&sdk_config), topic_arn);

    let context = Arc::new(ServiceContext::new(provider, gateway, notifier));

    let result = match config.transport {
        TransportMode::Stdio => StdioTransport::new(context).run().await,
        TransportMode::Http => {
            let auth = AuthConfig::from_tokens(config.auth_tokens.clone())?;
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                context,
                auth,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
