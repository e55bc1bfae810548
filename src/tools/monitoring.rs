//! CloudWatch, CloudWatch Logs, RDS and SNS tools.

use crate::error::DbResult;
use crate::models::{
    AlarmFilter, AlarmState, AlarmsResult, ClustersResult, HealthInsight, LogGroupFilter,
    LogGroupsResult, LogsQueryResult, LogsRequest, MetricRequest, MetricSeriesResult,
    NotificationResult, PerformanceMetricsResult, Severity,
};
use crate::monitoring::{MetricsGateway, MonitoringApi};
use crate::notify::{AlertNotifier, AlertPublisher};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListAlarmsInput {
    /// Alarm name prefix
    #[serde(default)]
    pub name_prefix: Option<String>,
    /// Alarm state filter: OK, ALARM or INSUFFICIENT_DATA
    #[serde(default)]
    pub state: Option<String>,
    /// Maximum alarms to return. Default: 50, max: 100
    #[serde(default)]
    pub max_records: Option<i32>,
    /// Limit to alarms named after the configured cluster when no prefix is given
    #[serde(default)]
    pub cluster_alarms: bool,
}

impl ListAlarmsInput {
    pub fn into_filter(self) -> DbResult<AlarmFilter> {
        let state = match self.state.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(AlarmState::parse(s)?),
            _ => None,
        };
        Ok(AlarmFilter {
            name_prefix: self.name_prefix,
            state,
            max_records: self.max_records,
            cluster_alarms: self.cluster_alarms,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct HoursBackInput {
    /// Hours of history. Default: 1, max: 24
    #[serde(default)]
    pub hours_back: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SendNotificationInput {
    pub subject: String,
    pub message: String,
    /// INFO (default), WARNING or CRITICAL
    #[serde(default)]
    pub severity: Severity,
}

pub struct MonitoringToolHandler<M> {
    gateway: Arc<MetricsGateway<M>>,
}

impl<M: MonitoringApi> MonitoringToolHandler<M> {
    pub fn new(gateway: Arc<MetricsGateway<M>>) -> Self {
        Self { gateway }
    }

    pub async fn list_alarms(&self, input: ListAlarmsInput) -> DbResult<AlarmsResult> {
        let filter = input.into_filter()?;
        Ok(self.gateway.list_alarms(&filter).await)
    }

    pub async fn metric_statistics(&self, input: MetricRequest) -> MetricSeriesResult {
        self.gateway.metric_series(&input).await
    }

    pub async fn cpu_utilization(&self, input: HoursBackInput) -> MetricSeriesResult {
        self.gateway.cpu_utilization(input.hours_back).await
    }

    pub async fn database_connections(&self, input: HoursBackInput) -> MetricSeriesResult {
        self.gateway.database_connections(input.hours_back).await
    }

    pub async fn performance_metrics(&self, input: HoursBackInput) -> PerformanceMetricsResult {
        self.gateway.performance_metrics(input.hours_back).await
    }

    pub async fn comprehensive_insight(&self, input: HoursBackInput) -> HealthInsight {
        self.gateway.comprehensive_insight(input.hours_back).await
    }

    pub async fn list_log_groups(&self, input: LogGroupFilter) -> LogGroupsResult {
        self.gateway.list_log_groups(&input).await
    }

    pub async fn query_logs(&self, input: LogsRequest) -> LogsQueryResult {
        self.gateway.query_logs(&input).await
    }

    pub async fn discover_clusters(&self) -> ClustersResult {
        self.gateway.discover_clusters().await
    }
}

pub struct NotificationToolHandler<P> {
    notifier: Arc<AlertNotifier<P>>,
}

impl<P: AlertPublisher> NotificationToolHandler<P> {
    pub fn new(notifier: Arc<AlertNotifier<P>>) -> Self {
        Self { notifier }
    }

    pub async fn send(&self, input: SendNotificationInput) -> NotificationResult {
        self.notifier
            .send_alert(&input.subject, &input.message, input.severity)
            .await
    }
}
