//! Read-only metrics, alarms, logs and cluster discovery gateway.
//!
//! [`MetricsGateway`] validates and clamps caller arguments, fills in the
//! configured cluster/instance identifiers, and folds every failure into a
//! tagged result. The cloud calls go through [`MonitoringApi`] so tests can
//! substitute a fake.

pub mod cloudwatch;

pub use cloudwatch::CloudWatchMonitoring;

use crate::error::{DbError, DbResult};
use crate::models::{
    AlarmFilter, AlarmQuery, AlarmState, AlarmSummary, AlarmsResult, AuroraCluster,
    ClustersResult, HealthInsight, LogGroupFilter, LogGroupQuery, LogGroupSummary,
    LogGroupsResult, LogsQuery, LogsQueryPage, LogsQueryResult, LogsQueryStatus, LogsRequest,
    MetricDatapoint, MetricDimension, MetricQuery, MetricRequest, MetricSeriesResult,
    PerformanceMetricsResult, Statistic, Status,
};
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_NAMESPACE: &str = "AWS/RDS";
pub const DEFAULT_MAX_RECORDS: i32 = 50;
pub const MAX_RECORDS_LIMIT: i32 = 100;
pub const DEFAULT_HOURS_BACK: i64 = 1;
pub const MAX_HOURS_BACK: i64 = 24;
pub const DEFAULT_PERIOD_SECS: i32 = 300;
pub const MIN_PERIOD_SECS: i32 = 60;

/// CPU average above this costs health points.
pub const CPU_ALERT_PERCENT: f64 = 80.0;
const CPU_PENALTY: u32 = 20;
const ALARM_PENALTY: u32 = 10;

pub const DEFAULT_LOG_GROUP_LIMIT: i32 = 50;
pub const MAX_LOG_GROUP_LIMIT: i32 = 100;
/// Rows requested from each Logs Insights query.
pub const LOGS_QUERY_LIMIT: i32 = 100;
pub const DEFAULT_LOGS_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_LOGS_TIMEOUT: Duration = Duration::from_secs(30);

pub const INSTANCE_DIMENSION: &str = "DBInstanceIdentifier";
pub const CLUSTER_DIMENSION: &str = "DBClusterIdentifier";

/// Instance-level metrics reported by `performance_metrics`.
pub const PERFORMANCE_METRICS: [&str; 7] = [
    "ReadLatency",
    "WriteLatency",
    "ReadIOPS",
    "WriteIOPS",
    "ReadThroughput",
    "WriteThroughput",
    "DBLoad",
];

/// Cloud monitoring calls used by the gateway.
pub trait MonitoringApi: Send + Sync {
    fn describe_alarms(
        &self,
        query: &AlarmQuery,
    ) -> impl Future<Output = DbResult<Vec<AlarmSummary>>> + Send;

    fn get_metric_statistics(
        &self,
        query: &MetricQuery,
    ) -> impl Future<Output = DbResult<Vec<MetricDatapoint>>> + Send;

    /// At most `query.limit` log groups, following pagination as needed.
    fn describe_log_groups(
        &self,
        query: &LogGroupQuery,
    ) -> impl Future<Output = DbResult<Vec<LogGroupSummary>>> + Send;

    /// Start a Logs Insights query and return its id.
    fn start_logs_query(&self, query: &LogsQuery) -> impl Future<Output = DbResult<String>> + Send;

    fn logs_query_results(
        &self,
        query_id: &str,
    ) -> impl Future<Output = DbResult<LogsQueryPage>> + Send;

    /// Every DB cluster in the region, any engine.
    fn describe_db_clusters(&self) -> impl Future<Output = DbResult<Vec<AuroraCluster>>> + Send;
}

pub fn clamp_max_records(requested: Option<i32>) -> i32 {
    requested
        .unwrap_or(DEFAULT_MAX_RECORDS)
        .clamp(1, MAX_RECORDS_LIMIT)
}

pub fn clamp_hours_back(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_HOURS_BACK)
        .clamp(1, MAX_HOURS_BACK)
}

/// Default 50, at most 100; a non-positive limit falls back to the default.
pub fn clamp_log_group_limit(requested: Option<i32>) -> i32 {
    match requested {
        Some(limit) if limit >= 1 => limit.min(MAX_LOG_GROUP_LIMIT),
        _ => DEFAULT_LOG_GROUP_LIMIT,
    }
}

/// Default 300 s, floor 60 s, rounded down to a whole minute.
pub fn clamp_period(requested: Option<i32>) -> i32 {
    let period = requested.unwrap_or(DEFAULT_PERIOD_SECS).max(MIN_PERIOD_SECS);
    period - period % 60
}

/// 100, minus 20 when CPU is above 80%, minus 10 per alarm in ALARM, floored at 0.
pub fn health_score(cpu_percent: Option<f64>, alarms_in_alarm: usize) -> u32 {
    let mut penalty: u32 = 0;
    if cpu_percent.is_some_and(|cpu| cpu > CPU_ALERT_PERCENT) {
        penalty += CPU_PENALTY;
    }
    let alarm_count = u32::try_from(alarms_in_alarm).unwrap_or(u32::MAX);
    penalty = penalty.saturating_add(alarm_count.saturating_mul(ALARM_PENALTY));
    100u32.saturating_sub(penalty)
}

pub struct MetricsGateway<M> {
    api: M,
    cluster_id: Option<String>,
    instance_id: Option<String>,
    logs_poll_interval: Duration,
    logs_timeout: Duration,
}

impl<M: MonitoringApi> MetricsGateway<M> {
    pub fn new(api: M, cluster_id: Option<String>, instance_id: Option<String>) -> Self {
        Self {
            api,
            cluster_id: cluster_id.filter(|s| !s.trim().is_empty()),
            instance_id: instance_id.filter(|s| !s.trim().is_empty()),
            logs_poll_interval: DEFAULT_LOGS_POLL_INTERVAL,
            logs_timeout: DEFAULT_LOGS_TIMEOUT,
        }
    }

    /// How often a running Logs Insights query is polled and how long to wait for it.
    pub fn with_logs_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.logs_poll_interval = interval;
        self.logs_timeout = timeout;
        self
    }

    pub fn cluster_id(&self) -> Option<&str> {
        self.cluster_id.as_deref()
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    pub async fn list_alarms(&self, filter: &AlarmFilter) -> AlarmsResult {
        let prefix = filter
            .name_prefix
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| {
                filter
                    .cluster_alarms
                    .then(|| self.cluster_id.clone())
                    .flatten()
            });

        if filter.cluster_alarms && prefix.is_none() {
            let err = missing_identifier("cluster", "--cluster-id");
            return AlarmsResult::failure(&err, None);
        }

        let query = AlarmQuery {
            name_prefix: prefix.clone(),
            state: filter.state,
            max_records: clamp_max_records(filter.max_records),
        };
        match self.api.describe_alarms(&query).await {
            Ok(alarms) => {
                info!(count = alarms.len(), prefix = ?query.name_prefix, "Listed alarms");
                AlarmsResult::success(alarms, prefix)
            }
            Err(e) => {
                warn!(error = %e, "Failed to list alarms");
                AlarmsResult::failure(&e, prefix)
            }
        }
    }

    /// Fetch one metric series; datapoints come back oldest first.
    pub async fn metric_series(&self, request: &MetricRequest) -> MetricSeriesResult {
        let hours_back = clamp_hours_back(request.hours_back);
        let period_secs = clamp_period(request.period_secs);
        let namespace = request
            .namespace
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let shell = MetricSeriesResult {
            status: Status::Success,
            namespace,
            metric_name: request.metric_name.trim().to_string(),
            dimension: None,
            statistics: Vec::new(),
            hours_back,
            period_secs,
            datapoints: Vec::new(),
            count: 0,
            latest: None,
            error: None,
            error_kind: None,
        };

        match build_metric_query(request, &shell) {
            Ok(query) => {
                let mut result = MetricSeriesResult {
                    dimension: query.dimension.clone(),
                    statistics: query.statistics.clone(),
                    ..shell
                };
                match self.api.get_metric_statistics(&query).await {
                    Ok(mut datapoints) => {
                        datapoints.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
                        info!(
                            metric = %query.metric_name,
                            datapoints = datapoints.len(),
                            "Fetched metric statistics"
                        );
                        result.count = datapoints.len();
                        result.latest = datapoints.last().cloned();
                        result.datapoints = datapoints;
                        result
                    }
                    Err(e) => {
                        warn!(metric = %query.metric_name, error = %e, "Failed to fetch metric statistics");
                        series_failure(result, &e)
                    }
                }
            }
            Err(e) => series_failure(shell, &e),
        }
    }

    pub async fn cpu_utilization(&self, hours_back: Option<i64>) -> MetricSeriesResult {
        let request = self.instance_request("CPUUtilization", &["Average", "Maximum"], hours_back);
        self.identified_series(request, self.instance_id.is_some(), "instance", "--instance-id")
            .await
    }

    pub async fn database_connections(&self, hours_back: Option<i64>) -> MetricSeriesResult {
        let request = MetricRequest {
            metric_name: "DatabaseConnections".to_string(),
            dimension_name: Some(CLUSTER_DIMENSION.to_string()),
            dimension_value: self.cluster_id.clone(),
            statistics: Some(vec!["Average".to_string()]),
            hours_back,
            ..MetricRequest::default()
        };
        self.identified_series(request, self.cluster_id.is_some(), "cluster", "--cluster-id")
            .await
    }

    pub async fn performance_metrics(&self, hours_back: Option<i64>) -> PerformanceMetricsResult {
        let hours = clamp_hours_back(hours_back);
        if self.instance_id.is_none() {
            let err = missing_identifier("instance", "--instance-id");
            return PerformanceMetricsResult {
                status: Status::Error,
                instance_id: None,
                hours_back: hours,
                metrics: Vec::new(),
                error: Some(err.to_string()),
                error_kind: Some(err.kind()),
            };
        }

        let mut metrics = Vec::with_capacity(PERFORMANCE_METRICS.len());
        for metric in PERFORMANCE_METRICS {
            let request = self.instance_request(metric, &["Average"], hours_back);
            metrics.push(self.metric_series(&request).await);
        }

        let first_error = metrics
            .iter()
            .find(|m| !m.is_success())
            .map(|m| (m.error.clone(), m.error_kind));
        let all_failed = metrics.iter().all(|m| !m.is_success());
        let (status, error, error_kind) = match first_error {
            Some((error, kind)) if all_failed => (Status::Error, error, kind),
            _ => (Status::Success, None, None),
        };

        PerformanceMetricsResult {
            status,
            instance_id: self.instance_id.clone(),
            hours_back: hours,
            metrics,
            error,
            error_kind,
        }
    }

    /// CPU, connections and active alarms folded into one health view.
    ///
    /// Inputs that cannot be fetched are reported as findings; only a missing
    /// pair of identifiers makes the whole insight an error.
    pub async fn comprehensive_insight(&self, hours_back: Option<i64>) -> HealthInsight {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut insight = HealthInsight {
            status: Status::Success,
            health_score: 100,
            cpu_utilization_percent: None,
            active_connections: None,
            alarms_in_alarm: 0,
            alarm_names: Vec::new(),
            findings: Vec::new(),
            cluster_id: self.cluster_id.clone(),
            instance_id: self.instance_id.clone(),
            timestamp,
            error: None,
            error_kind: None,
        };

        if self.cluster_id.is_none() && self.instance_id.is_none() {
            let err = DbError::config(
                "Neither a cluster nor an instance identifier is configured; set --cluster-id or --instance-id",
            );
            insight.status = Status::Error;
            insight.health_score = 0;
            insight.error = Some(err.to_string());
            insight.error_kind = Some(err.kind());
            return insight;
        }

        let cpu = self.cpu_utilization(hours_back).await;
        match (cpu.is_success(), cpu.latest_average()) {
            (true, Some(value)) => insight.cpu_utilization_percent = Some(round2(value)),
            (true, None) => insight.findings.push("No recent CPU datapoints".to_string()),
            (false, _) => insight.findings.push(format!(
                "CPU utilization unavailable: {}",
                cpu.error.unwrap_or_default()
            )),
        }

        let connections = self.database_connections(hours_back).await;
        match (connections.is_success(), connections.latest_average()) {
            (true, Some(value)) => insight.active_connections = Some(value.round()),
            (true, None) => insight
                .findings
                .push("No recent connection datapoints".to_string()),
            (false, _) => insight.findings.push(format!(
                "Connection count unavailable: {}",
                connections.error.unwrap_or_default()
            )),
        }

        if self.cluster_id.is_some() {
            let filter = AlarmFilter {
                state: Some(AlarmState::Alarm),
                max_records: Some(MAX_RECORDS_LIMIT),
                cluster_alarms: true,
                ..AlarmFilter::default()
            };
            let alarms = self.list_alarms(&filter).await;
            if alarms.status == Status::Success {
                insight.alarm_names = alarms
                    .alarms
                    .iter()
                    .filter(|a| a.is_alarming())
                    .map(|a| a.alarm_name.clone())
                    .collect();
                insight.alarms_in_alarm = insight.alarm_names.len();
            } else {
                insight.findings.push(format!(
                    "Alarms unavailable: {}",
                    alarms.error.unwrap_or_default()
                ));
            }
        }

        if insight
            .cpu_utilization_percent
            .is_some_and(|cpu| cpu > CPU_ALERT_PERCENT)
        {
            insight.findings.push(format!(
                "CPU above {CPU_ALERT_PERCENT}% (-{CPU_PENALTY})"
            ));
        }
        if insight.alarms_in_alarm > 0 {
            insight.findings.push(format!(
                "{} alarm(s) in ALARM state (-{} each)",
                insight.alarms_in_alarm, ALARM_PENALTY
            ));
        }
        insight.health_score =
            health_score(insight.cpu_utilization_percent, insight.alarms_in_alarm);

        info!(
            health_score = insight.health_score,
            alarms_in_alarm = insight.alarms_in_alarm,
            "Computed health insight"
        );
        insight
    }

    pub async fn list_log_groups(&self, filter: &LogGroupFilter) -> LogGroupsResult {
        let prefix = filter
            .name_prefix
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let query = LogGroupQuery {
            name_prefix: prefix.clone(),
            limit: clamp_log_group_limit(filter.limit),
        };
        match self.api.describe_log_groups(&query).await {
            Ok(mut groups) => {
                groups.truncate(usize::try_from(query.limit).unwrap_or_default());
                info!(count = groups.len(), prefix = ?query.name_prefix, "Listed log groups");
                LogGroupsResult::success(groups, prefix)
            }
            Err(e) => {
                warn!(error = %e, "Failed to list log groups");
                LogGroupsResult::failure(&e, prefix)
            }
        }
    }

    /// Run a Logs Insights query and wait for it to finish.
    ///
    /// The query is polled until it leaves the scheduled/running states or the
    /// configured timeout passes; at most [`LOGS_QUERY_LIMIT`] rows come back.
    pub async fn query_logs(&self, request: &LogsRequest) -> LogsQueryResult {
        let hours_back = clamp_hours_back(request.hours_back);
        let mut result = LogsQueryResult {
            status: Status::Success,
            log_group_name: request.log_group_name.trim().to_string(),
            query: request.query.trim().to_string(),
            hours_back,
            query_id: None,
            query_status: None,
            rows: Vec::new(),
            count: 0,
            error: None,
            error_kind: None,
        };

        if result.log_group_name.is_empty() {
            return logs_failure(result, &DbError::invalid_input("log_group_name is required"));
        }
        if result.query.is_empty() {
            return logs_failure(result, &DbError::invalid_input("query is required"));
        }

        let end = Utc::now();
        let query = LogsQuery {
            log_group_name: result.log_group_name.clone(),
            query: result.query.clone(),
            start: end - ChronoDuration::hours(hours_back),
            end,
            limit: LOGS_QUERY_LIMIT,
        };

        let query_id = match self.api.start_logs_query(&query).await {
            Ok(id) => id,
            Err(e) => {
                warn!(log_group = %query.log_group_name, error = %e, "Failed to start logs query");
                return logs_failure(result, &e);
            }
        };
        result.query_id = Some(query_id.clone());

        match self.await_logs_query(&query_id).await {
            Ok(page) => {
                info!(
                    log_group = %query.log_group_name,
                    query_id = %query_id,
                    rows = page.rows.len(),
                    "Logs query complete"
                );
                result.query_status = Some(page.status);
                result.count = page.rows.len();
                result.rows = page.rows;
                result
            }
            Err((status, e)) => {
                warn!(query_id = %query_id, error = %e, "Logs query did not complete");
                result.query_status = status;
                logs_failure(result, &e)
            }
        }
    }

    /// Aurora clusters in the region with their writer and reader instances.
    pub async fn discover_clusters(&self) -> ClustersResult {
        match self.api.describe_db_clusters().await {
            Ok(clusters) => {
                let total = clusters.len();
                let aurora: Vec<AuroraCluster> =
                    clusters.into_iter().filter(AuroraCluster::is_aurora).collect();
                info!(clusters = total, aurora = aurora.len(), "Discovered DB clusters");
                ClustersResult::success(aurora)
            }
            Err(e) => {
                warn!(error = %e, "Failed to describe DB clusters");
                ClustersResult::failure(&e)
            }
        }
    }

    async fn await_logs_query(
        &self,
        query_id: &str,
    ) -> Result<LogsQueryPage, (Option<LogsQueryStatus>, DbError)> {
        let deadline = Instant::now() + self.logs_timeout;
        loop {
            let page = self
                .api
                .logs_query_results(query_id)
                .await
                .map_err(|e| (None, e))?;
            if !page.status.is_pending() {
                return match page.status {
                    LogsQueryStatus::Complete => Ok(page),
                    other => Err((
                        Some(other),
                        DbError::query(
                            format!("Logs query {query_id} ended with status {other:?}"),
                            None,
                            "Check the query syntax and narrow the time range",
                        ),
                    )),
                };
            }
            if Instant::now() >= deadline {
                return Err((
                    Some(page.status),
                    DbError::query(
                        format!(
                            "Logs query {query_id} still {:?} after {:?}",
                            page.status, self.logs_timeout
                        ),
                        None,
                        "Narrow the time range or add a filter to the query",
                    ),
                ));
            }
            debug!(query_id = %query_id, status = ?page.status, "Logs query pending");
            tokio::time::sleep(self.logs_poll_interval).await;
        }
    }

    fn instance_request(
        &self,
        metric_name: &str,
        statistics: &[&str],
        hours_back: Option<i64>,
    ) -> MetricRequest {
        MetricRequest {
            metric_name: metric_name.to_string(),
            dimension_name: Some(INSTANCE_DIMENSION.to_string()),
            dimension_value: self.instance_id.clone(),
            statistics: Some(statistics.iter().map(|s| s.to_string()).collect()),
            hours_back,
            ..MetricRequest::default()
        }
    }

    async fn identified_series(
        &self,
        request: MetricRequest,
        has_identifier: bool,
        what: &str,
        flag: &str,
    ) -> MetricSeriesResult {
        if has_identifier {
            return self.metric_series(&request).await;
        }
        let err = missing_identifier(what, flag);
        MetricSeriesResult {
            status: Status::Error,
            namespace: DEFAULT_NAMESPACE.to_string(),
            metric_name: request.metric_name,
            dimension: None,
            statistics: Vec::new(),
            hours_back: clamp_hours_back(request.hours_back),
            period_secs: clamp_period(request.period_secs),
            datapoints: Vec::new(),
            count: 0,
            latest: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }
}

fn build_metric_query(request: &MetricRequest, shell: &MetricSeriesResult) -> DbResult<MetricQuery> {
    if shell.metric_name.is_empty() {
        return Err(DbError::invalid_input("metric_name is required"));
    }

    let dimension = match (
        request.dimension_name.as_deref().map(str::trim),
        request.dimension_value.as_deref().map(str::trim),
    ) {
        (Some(name), Some(value)) if !name.is_empty() && !value.is_empty() => Some(MetricDimension {
            name: name.to_string(),
            value: value.to_string(),
        }),
        (None, None) => None,
        (Some(name), _) if name.is_empty() => None,
        _ => {
            return Err(DbError::invalid_input(
                "dimension_name and dimension_value must be given together",
            ));
        }
    };

    let mut statistics = Vec::new();
    for raw in request.statistics.iter().flatten() {
        let statistic = Statistic::parse(raw)?;
        if !statistics.contains(&statistic) {
            statistics.push(statistic);
        }
    }
    if statistics.is_empty() {
        statistics.push(Statistic::Average);
    }

    let end = Utc::now();
    let start = end - ChronoDuration::hours(shell.hours_back);
    Ok(MetricQuery {
        namespace: shell.namespace.clone(),
        metric_name: shell.metric_name.clone(),
        dimension,
        statistics,
        start,
        end,
        period_secs: shell.period_secs,
    })
}

fn series_failure(mut result: MetricSeriesResult, err: &DbError) -> MetricSeriesResult {
    result.status = Status::Error;
    result.error = Some(err.to_string());
    result.error_kind = Some(err.kind());
    result
}

fn logs_failure(mut result: LogsQueryResult, err: &DbError) -> LogsQueryResult {
    result.status = Status::Error;
    result.error = Some(err.to_string());
    result.error_kind = Some(err.kind());
    result
}

fn missing_identifier(what: &str, flag: &str) -> DbError {
    DbError::config(format!(
        "No DB {what} identifier configured; set {flag} or add it to the database secret"
    ))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_max_records() {
        assert_eq!(clamp_max_records(None), 50);
        assert_eq!(clamp_max_records(Some(0)), 1);
        assert_eq!(clamp_max_records(Some(-5)), 1);
        assert_eq!(clamp_max_records(Some(250)), 100);
        assert_eq!(clamp_max_records(Some(20)), 20);
    }

    #[test]
    fn test_clamp_hours_back() {
        assert_eq!(clamp_hours_back(None), 1);
        assert_eq!(clamp_hours_back(Some(0)), 1);
        assert_eq!(clamp_hours_back(Some(48)), 24);
        assert_eq!(clamp_hours_back(Some(6)), 6);
    }

    #[test]
    fn test_clamp_log_group_limit() {
        assert_eq!(clamp_log_group_limit(None), 50);
        assert_eq!(clamp_log_group_limit(Some(0)), 50);
        assert_eq!(clamp_log_group_limit(Some(-3)), 50);
        assert_eq!(clamp_log_group_limit(Some(7)), 7);
        assert_eq!(clamp_log_group_limit(Some(500)), 100);
    }

    #[test]
    fn test_clamp_period() {
        assert_eq!(clamp_period(None), 300);
        assert_eq!(clamp_period(Some(10)), 60);
        assert_eq!(clamp_period(Some(90)), 60);
        assert_eq!(clamp_period(Some(3600)), 3600);
    }

    #[test]
    fn test_health_score() {
        assert_eq!(health_score(None, 0), 100);
        assert_eq!(health_score(Some(80.0), 0), 100);
        assert_eq!(health_score(Some(80.5), 0), 80);
        assert_eq!(health_score(Some(95.0), 2), 60);
        assert_eq!(health_score(Some(99.0), 9), 0);
        assert_eq!(health_score(None, usize::MAX), 0);
    }

    #[test]
    fn test_metric_query_defaults() {
        let request = MetricRequest {
            metric_name: "FreeableMemory".into(),
            ..Default::default()
        };
        let shell = MetricSeriesResult {
            status: Status::Success,
            namespace: DEFAULT_NAMESPACE.into(),
            metric_name: "FreeableMemory".into(),
            dimension: None,
            statistics: Vec::new(),
            hours_back: 2,
            period_secs: 300,
            datapoints: Vec::new(),
            count: 0,
            latest: None,
            error: None,
            error_kind: None,
        };
        let query = build_metric_query(&request, &shell).unwrap();
        assert_eq!(query.statistics, vec![Statistic::Average]);
        assert_eq!(query.dimension, None);
        assert_eq!((query.end - query.start).num_hours(), 2);
    }

    #[test]
    fn test_metric_query_rejects_half_dimension() {
        let request = MetricRequest {
            metric_name: "CPUUtilization".into(),
            dimension_name: Some("DBInstanceIdentifier".into()),
            ..Default::default()
        };
        let shell = MetricSeriesResult {
            status: Status::Success,
            namespace: DEFAULT_NAMESPACE.into(),
            metric_name: "CPUUtilization".into(),
            dimension: None,
            statistics: Vec::new(),
            hours_back: 1,
            period_secs: 300,
            datapoints: Vec::new(),
            count: 0,
            latest: None,
            error: None,
            error_kind: None,
        };
        assert!(build_metric_query(&request, &shell).is_err());
    }
}
