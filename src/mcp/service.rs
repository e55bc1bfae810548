//! MCP service implementation using rmcp.
//!
//! `DbOpsService` exposes the diagnostic catalog, the safe mutation executor,
//! the CloudWatch/Logs/RDS gateway and the SNS notifier as MCP tools.

use crate::actions::SafeMutationExecutor;
use crate::db::PgConnectionProvider;
use crate::diagnostics::{Diagnostic, DiagnosticCatalog};
use crate::models::{
    AlarmsResult, ClustersResult, HealthInsight, LogGroupFilter, LogGroupsResult,
    LogsQueryResult, LogsRequest, MetricRequest, MetricSeriesResult, MutationReport,
    NotificationResult, PerformanceMetricsResult, QueryResult, SafetyVerdict,
};
use crate::monitoring::{CloudWatchMonitoring, MetricsGateway};
use crate::notify::{AlertNotifier, SnsPublisher};
use crate::tools::{
    AnalyzeInput, CreateIndexInput, DiagnosticInput, DiagnosticToolHandler, HoursBackInput,
    ListAlarmsInput, ListDiagnosticsOutput, MaintenanceToolHandler, MonitoringToolHandler,
    NotificationToolHandler, RunDiagnosticInput, SendNotificationInput, VacuumInput,
    ValidateSqlInput,
};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

/// Components shared by every tool call.
pub struct ServiceContext {
    pub catalog: Arc<DiagnosticCatalog<PgConnectionProvider>>,
    pub executor: Arc<SafeMutationExecutor<PgConnectionProvider>>,
    pub gateway: Arc<MetricsGateway<CloudWatchMonitoring>>,
    pub notifier: Arc<AlertNotifier<SnsPublisher>>,
}

impl ServiceContext {
    pub fn new(
        provider: PgConnectionProvider,
        gateway: MetricsGateway<CloudWatchMonitoring>,
        notifier: AlertNotifier<SnsPublisher>,
    ) -> Self {
        Self {
            catalog: Arc::new(DiagnosticCatalog::new(provider.clone())),
            executor: Arc::new(SafeMutationExecutor::new(provider)),
            gateway: Arc::new(gateway),
            notifier: Arc::new(notifier),
        }
    }
}

#[derive(Clone)]
pub struct DbOpsService {
    context: Arc<ServiceContext>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbOpsService {
    pub fn new(context: Arc<ServiceContext>) -> Self {
        Self {
            context,
            tool_router: Self::tool_router(),
        }
    }

    fn diagnostics(&self) -> DiagnosticToolHandler<PgConnectionProvider> {
        DiagnosticToolHandler::new(self.context.catalog.clone())
    }

    fn maintenance(&self) -> MaintenanceToolHandler<PgConnectionProvider> {
        MaintenanceToolHandler::new(self.context.executor.clone())
    }

    fn monitoring(&self) -> MonitoringToolHandler<CloudWatchMonitoring> {
        MonitoringToolHandler::new(self.context.gateway.clone())
    }

    async fn diagnostic(&self, diagnostic: Diagnostic, input: DiagnosticInput) -> Json<QueryResult> {
        Json(self.diagnostics().run(diagnostic, input).await)
    }
}

#[tool_router]
impl DbOpsService {
    #[tool(
        description = "List the largest tables by total size (heap, indexes and TOAST).\nOutput format: json (default), table, or markdown."
    )]
    async fn largest_tables(
        &self,
        Parameters(input): Parameters<DiagnosticInput>,
    ) -> Json<QueryResult> {
        self.diagnostic(Diagnostic::LargestTables, input).await
    }

    #[tool(
        description = "Find indexes that are rarely scanned but take space.\nPrimary keys are excluded; unique indexes are flagged with is_unique."
    )]
    async fn unused_indexes(
        &self,
        Parameters(input): Parameters<DiagnosticInput>,
    ) -> Json<QueryResult> {
        self.diagnostic(Diagnostic::UnusedIndexes, input).await
    }

    #[tool(
        description = "Estimate table bloat from catalog statistics.\nEstimates depend on fresh ANALYZE statistics."
    )]
    async fn table_bloat(&self, Parameters(input): Parameters<DiagnosticInput>) -> Json<QueryResult> {
        self.diagnostic(Diagnostic::TableBloat, input).await
    }

    #[tool(description = "Estimate B-tree index bloat from catalog statistics.")]
    async fn index_bloat(&self, Parameters(input): Parameters<DiagnosticInput>) -> Json<QueryResult> {
        self.diagnostic(Diagnostic::IndexBloat, input).await
    }

    #[tool(
        description = "List statements with the highest mean execution time.\nRequires the pg_stat_statements extension."
    )]
    async fn slow_queries(
        &self,
        Parameters(input): Parameters<DiagnosticInput>,
    ) -> Json<QueryResult> {
        self.diagnostic(Diagnostic::SlowQueries, input).await
    }

    #[tool(
        description = "List statements with the highest total execution time.\nRequires the pg_stat_statements extension."
    )]
    async fn top_queries(&self, Parameters(input): Parameters<DiagnosticInput>) -> Json<QueryResult> {
        self.diagnostic(Diagnostic::TopQueries, input).await
    }

    #[tool(
        description = "Show sessions waiting on locks together with the sessions blocking them.\nAn empty result means nothing is blocked."
    )]
    async fn blocking_queries(
        &self,
        Parameters(input): Parameters<DiagnosticInput>,
    ) -> Json<QueryResult> {
        self.diagnostic(Diagnostic::BlockingQueries, input).await
    }

    #[tool(description = "List every diagnostic that run_diagnostic accepts.")]
    async fn list_diagnostics(&self) -> Json<ListDiagnosticsOutput> {
        Json(self.diagnostics().list())
    }

    #[tool(
        description = "Run a catalog diagnostic by name (see list_diagnostics), e.g. dead_tuples, wait_events, buffer_cache_hit_ratio.\nAll diagnostics are read-only."
    )]
    async fn run_diagnostic(
        &self,
        Parameters(input): Parameters<RunDiagnosticInput>,
    ) -> Result<Json<QueryResult>, McpError> {
        self.diagnostics()
            .run_named(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Create an index with CREATE INDEX CONCURRENTLY.\nChecks the table exists and the index name is free before building, then verifies the index is valid.\nA failed build may leave an INVALID index behind; it is reported, never dropped automatically."
    )]
    async fn create_index_concurrently(
        &self,
        Parameters(input): Parameters<CreateIndexInput>,
    ) -> Json<MutationReport> {
        Json(self.maintenance().create_index(input).await)
    }

    #[tool(description = "Refresh planner statistics with ANALYZE for one table or the whole database.")]
    async fn analyze_table(
        &self,
        Parameters(input): Parameters<AnalyzeInput>,
    ) -> Json<MutationReport> {
        Json(self.maintenance().analyze(input).await)
    }

    #[tool(
        description = "Run a plain VACUUM (never VACUUM FULL) on a table, with ANALYZE by default."
    )]
    async fn vacuum_table(
        &self,
        Parameters(input): Parameters<VacuumInput>,
    ) -> Json<MutationReport> {
        Json(self.maintenance().vacuum(input).await)
    }

    #[tool(
        description = "Check whether SQL text is a safe maintenance statement.\nThe SQL is never executed."
    )]
    async fn validate_sql(
        &self,
        Parameters(input): Parameters<ValidateSqlInput>,
    ) -> Json<SafetyVerdict> {
        Json(self.maintenance().validate_sql(input))
    }

    #[tool(
        description = "List CloudWatch alarms, optionally filtered by name prefix and state (OK, ALARM, INSUFFICIENT_DATA)."
    )]
    async fn list_alarms(
        &self,
        Parameters(input): Parameters<ListAlarmsInput>,
    ) -> Result<Json<AlarmsResult>, McpError> {
        self.monitoring()
            .list_alarms(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Fetch a CloudWatch metric series. Namespace defaults to AWS/RDS; the dimension defaults to the configured instance.\nhours_back is capped at 24."
    )]
    async fn get_metric_statistics(
        &self,
        Parameters(input): Parameters<MetricRequest>,
    ) -> Json<MetricSeriesResult> {
        Json(self.monitoring().metric_statistics(input).await)
    }

    #[tool(description = "CPUUtilization for the configured DB instance.")]
    async fn get_cpu_utilization(
        &self,
        Parameters(input): Parameters<HoursBackInput>,
    ) -> Json<MetricSeriesResult> {
        Json(self.monitoring().cpu_utilization(input).await)
    }

    #[tool(description = "DatabaseConnections for the configured DB instance.")]
    async fn get_database_connections(
        &self,
        Parameters(input): Parameters<HoursBackInput>,
    ) -> Json<MetricSeriesResult> {
        Json(self.monitoring().database_connections(input).await)
    }

    #[tool(
        description = "Fetch the standard RDS performance metrics (CPU, connections, memory, IOPS, latency) for the configured instance."
    )]
    async fn get_performance_metrics(
        &self,
        Parameters(input): Parameters<HoursBackInput>,
    ) -> Json<PerformanceMetricsResult> {
        Json(self.monitoring().performance_metrics(input).await)
    }

    #[tool(
        description = "Combine CPU, connections and alarm state into a health score (0-100) with findings."
    )]
    async fn get_comprehensive_insights(
        &self,
        Parameters(input): Parameters<HoursBackInput>,
    ) -> Json<HealthInsight> {
        Json(self.monitoring().comprehensive_insight(input).await)
    }

    #[tool(description = "List CloudWatch log groups, optionally by name prefix. Default limit 50, max 100.")]
    async fn list_log_groups(
        &self,
        Parameters(input): Parameters<LogGroupFilter>,
    ) -> Json<LogGroupsResult> {
        Json(self.monitoring().list_log_groups(input).await)
    }

    #[tool(
        description = "Run a CloudWatch Logs Insights query against one log group and wait for the results (at most 100 rows).
hours_back is capped at 24."
    )]
    async fn query_logs(&self, Parameters(input): Parameters<LogsRequest>) -> Json<LogsQueryResult> {
        Json(self.monitoring().query_logs(input).await)
    }

    #[tool(description = "Discover Aurora clusters in the region with their writer and reader instances.")]
    async fn discover_aurora_clusters(&self) -> Json<ClustersResult> {
        Json(self.monitoring().discover_clusters().await)
    }

    #[tool(description = "Publish an operations alert to the configured SNS topic.")]
    async fn send_notification(
        &self,
        Parameters(input): Parameters<SendNotificationInput>,
    ) -> Json<NotificationResult> {
        let handler = NotificationToolHandler::new(self.context.notifier.clone());
        Json(handler.send(input).await)
    }
}

#[tool_handler]
impl ServerHandler for DbOpsService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "dbops-mcp-server".to_owned(),
                title: Some("Database Operations MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Diagnostics and safe maintenance for one PostgreSQL database, plus CloudWatch and SNS.\n\
                \n\
                ## Diagnostics (read-only)\n\
                - `largest_tables`, `unused_indexes`, `table_bloat`, `index_bloat`, `blocking_queries`\n\
                - `slow_queries`, `top_queries` need the pg_stat_statements extension\n\
                - `list_diagnostics` then `run_diagnostic` for the rest of the catalog\n\
                \n\
                ## Maintenance\n\
                - `create_index_concurrently` never blocks writes and verifies the index afterwards\n\
                - `analyze_table`, `vacuum_table` (plain VACUUM only)\n\
                - `validate_sql` classifies SQL without running it\n\
                \n\
                ## Monitoring\n\
                - `list_alarms`, `get_metric_statistics`, `get_cpu_utilization`, `get_database_connections`\n\
                - `get_performance_metrics`, `get_comprehensive_insights`\n\
                - `list_log_groups`, `query_logs` (Logs Insights), `discover_aurora_clusters`\n\
                - `send_notification` publishes to the configured SNS topic\n\
                \n\
                Every result carries `status`; on error it also has `error` and `error_kind`."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> Arc<ServiceContext> {
    use crate::db::SessionSettings;
    use crate::models::ConnectionConfig;
    use aws_config::BehaviorVersion;
    use aws_types::SdkConfig;
    use aws_types::region::Region;

    let sdk = SdkConfig::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-west-2"))
        .build();
    let config = ConnectionConfig::new("localhost", "postgres", "postgres", "secret");
    let provider = PgConnectionProvider::new(config, SessionSettings::default());
    let gateway = MetricsGateway::new(
        CloudWatchMonitoring::new(&sdk),
        Some("aurora-cluster".into()),
        Some("aurora-instance-1".into()),
    );
    let notifier = AlertNotifier::new(SnsPublisher::new(&sdk), None);
    Arc::new(ServiceContext::new(provider, gateway, notifier))
}
