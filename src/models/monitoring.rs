//! Monitoring and notification result shapes.

use super::{JsonRow, Status};
use crate::error::{DbError, DbResult, ErrorKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// CloudWatch alarm state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmState {
    Ok,
    Alarm,
    InsufficientData,
}

impl AlarmState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Alarm => "ALARM",
            Self::InsufficientData => "INSUFFICIENT_DATA",
        }
    }

    pub fn parse(raw: &str) -> DbResult<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OK" => Ok(Self::Ok),
            "ALARM" => Ok(Self::Alarm),
            "INSUFFICIENT_DATA" => Ok(Self::InsufficientData),
            other => Err(DbError::invalid_input(format!(
                "Unknown alarm state '{other}'. Expected OK, ALARM or INSUFFICIENT_DATA"
            ))),
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing alarm filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AlarmFilter {
    /// Alarm name prefix
    #[serde(default)]
    pub name_prefix: Option<String>,
    /// Only alarms in this state
    #[serde(default)]
    pub state: Option<AlarmState>,
    /// Maximum alarms to return (1-100, default 50)
    #[serde(default)]
    pub max_records: Option<i32>,
    /// Use the configured cluster identifier as the prefix when none is given
    #[serde(default)]
    pub cluster_alarms: bool,
}

/// Resolved `DescribeAlarms` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmQuery {
    pub name_prefix: Option<String>,
    pub state: Option<AlarmState>,
    pub max_records: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AlarmSummary {
    pub alarm_name: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_arn: Option<String>,
}

impl AlarmSummary {
    pub fn is_alarming(&self) -> bool {
        self.state == AlarmState::Alarm.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AlarmsResult {
    pub status: Status,
    pub alarms: Vec<AlarmSummary>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl AlarmsResult {
    pub fn success(alarms: Vec<AlarmSummary>, name_prefix: Option<String>) -> Self {
        Self {
            status: Status::Success,
            count: alarms.len(),
            alarms,
            name_prefix,
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(err: &DbError, name_prefix: Option<String>) -> Self {
        Self {
            status: Status::Error,
            alarms: Vec::new(),
            count: 0,
            name_prefix,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }
}

/// CloudWatch statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Statistic {
    Average,
    Sum,
    Minimum,
    Maximum,
    SampleCount,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Average => "Average",
            Self::Sum => "Sum",
            Self::Minimum => "Minimum",
            Self::Maximum => "Maximum",
            Self::SampleCount => "SampleCount",
        }
    }

    pub fn parse(raw: &str) -> DbResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "average" | "avg" => Ok(Self::Average),
            "sum" => Ok(Self::Sum),
            "minimum" | "min" => Ok(Self::Minimum),
            "maximum" | "max" => Ok(Self::Maximum),
            "samplecount" | "sample_count" => Ok(Self::SampleCount),
            _ => Err(DbError::invalid_input(format!(
                "Unknown statistic '{}'. Expected Average, Sum, Minimum, Maximum or SampleCount",
                raw.trim()
            ))),
        }
    }
}

/// Caller-facing metric request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MetricRequest {
    /// CloudWatch namespace (default `AWS/RDS`)
    #[serde(default)]
    pub namespace: Option<String>,
    pub metric_name: String,
    /// Dimension name, e.g. `DBInstanceIdentifier`
    #[serde(default)]
    pub dimension_name: Option<String>,
    #[serde(default)]
    pub dimension_value: Option<String>,
    /// Statistics to fetch (default `Average`)
    #[serde(default)]
    pub statistics: Option<Vec<String>>,
    /// Hours of history (1-24, default 1)
    #[serde(default)]
    pub hours_back: Option<i64>,
    /// Datapoint period in seconds (default 300, minimum 60)
    #[serde(default)]
    pub period_secs: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MetricDimension {
    pub name: String,
    pub value: String,
}

/// Resolved `GetMetricStatistics` request.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimension: Option<MetricDimension>,
    pub statistics: Vec<Statistic>,
    pub start: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
    pub period_secs: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricDatapoint {
    /// RFC 3339, UTC, second precision
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl MetricDatapoint {
    pub fn at(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            average: None,
            maximum: None,
            minimum: None,
            sum: None,
            sample_count: None,
            unit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MetricSeriesResult {
    pub status: Status,
    pub namespace: String,
    pub metric_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<MetricDimension>,
    pub statistics: Vec<Statistic>,
    pub hours_back: i64,
    pub period_secs: i32,
    /// Ascending by timestamp
    pub datapoints: Vec<MetricDatapoint>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<MetricDatapoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl MetricSeriesResult {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Latest `Average`, if any datapoint carries one.
    pub fn latest_average(&self) -> Option<f64> {
        self.latest.as_ref().and_then(|p| p.average)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PerformanceMetricsResult {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    pub hours_back: i64,
    pub metrics: Vec<MetricSeriesResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

/// Composite health view. The score is a coarse placeholder heuristic.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HealthInsight {
    pub status: Status,
    /// 0-100
    pub health_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_utilization_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_connections: Option<f64>,
    pub alarms_in_alarm: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alarm_names: Vec<String>,
    /// Deductions applied and inputs that could not be fetched
    pub findings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

/// Caller-facing log group listing filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LogGroupFilter {
    /// Log group name prefix, e.g. `/aws/rds/cluster/`
    #[serde(default)]
    pub name_prefix: Option<String>,
    /// Maximum log groups to return (default 50, at most 100)
    #[serde(default)]
    pub limit: Option<i32>,
}

/// Resolved `DescribeLogGroups` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogGroupQuery {
    pub name_prefix: Option<String>,
    pub limit: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LogGroupSummary {
    pub log_group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_in_days: Option<i32>,
    #[serde(default)]
    pub stored_bytes: i64,
    #[serde(default)]
    pub metric_filter_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LogGroupsResult {
    pub status: Status,
    pub log_groups: Vec<LogGroupSummary>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl LogGroupsResult {
    pub fn success(log_groups: Vec<LogGroupSummary>, name_prefix: Option<String>) -> Self {
        Self {
            status: Status::Success,
            count: log_groups.len(),
            log_groups,
            name_prefix,
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(err: &DbError, name_prefix: Option<String>) -> Self {
        Self {
            status: Status::Error,
            log_groups: Vec::new(),
            count: 0,
            name_prefix,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }
}

/// Caller-facing Logs Insights request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LogsRequest {
    pub log_group_name: String,
    /// Logs Insights query, e.g. `fields @timestamp, @message | filter @message like /ERROR/`
    pub query: String,
    /// Hours of history (1-24, default 1)
    #[serde(default)]
    pub hours_back: Option<i64>,
}

/// Resolved `StartQuery` request.
#[derive(Debug, Clone, PartialEq)]
pub struct LogsQuery {
    pub log_group_name: String,
    pub query: String,
    pub start: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
    pub limit: i32,
}

/// Logs Insights query lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum LogsQueryStatus {
    Scheduled,
    Running,
    Complete,
    Failed,
    Cancelled,
    Timeout,
    Unknown,
}

impl LogsQueryStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Scheduled" => Self::Scheduled,
            "Running" => Self::Running,
            "Complete" => Self::Complete,
            "Failed" => Self::Failed,
            "Cancelled" => Self::Cancelled,
            "Timeout" => Self::Timeout,
            _ => Self::Unknown,
        }
    }

    /// Still scheduled or running.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Running)
    }
}

/// One `GetQueryResults` answer.
#[derive(Debug, Clone, PartialEq)]
pub struct LogsQueryPage {
    pub status: LogsQueryStatus,
    pub rows: Vec<JsonRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LogsQueryResult {
    pub status: Status,
    pub log_group_name: String,
    pub query: String,
    pub hours_back: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_status: Option<LogsQueryStatus>,
    /// One map per log record, field name to value
    pub rows: Vec<JsonRow>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl LogsQueryResult {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// An Aurora cluster and its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AuroraCluster {
    pub cluster_identifier: String,
    pub engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer_instance: Option<String>,
    #[serde(default)]
    pub reader_instances: Vec<String>,
}

impl AuroraCluster {
    pub fn is_aurora(&self) -> bool {
        self.engine.starts_with("aurora")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClustersResult {
    pub status: Status,
    pub clusters: Vec<AuroraCluster>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ClustersResult {
    pub fn success(clusters: Vec<AuroraCluster>) -> Self {
        Self {
            status: Status::Success,
            count: clusters.len(),
            clusters,
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(err: &DbError) -> Self {
        Self {
            status: Status::Error,
            clusters: Vec::new(),
            count: 0,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationResult {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub subject: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_state_parse() {
        assert_eq!(AlarmState::parse("alarm").unwrap(), AlarmState::Alarm);
        assert_eq!(
            AlarmState::parse(" insufficient_data ").unwrap(),
            AlarmState::InsufficientData
        );
        assert!(AlarmState::parse("FIRING").is_err());
        assert_eq!(
            serde_json::to_value(AlarmState::InsufficientData).unwrap(),
            "INSUFFICIENT_DATA"
        );
    }

    #[test]
    fn test_statistic_parse() {
        assert_eq!(Statistic::parse("avg").unwrap(), Statistic::Average);
        assert_eq!(Statistic::parse("Maximum").unwrap(), Statistic::Maximum);
        assert_eq!(Statistic::parse("sample_count").unwrap(), Statistic::SampleCount);
        let err = Statistic::parse("p99").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_severity_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Severity::Critical).unwrap(), "CRITICAL");
        let parsed: Severity = serde_json::from_value(serde_json::json!("WARNING")).unwrap();
        assert_eq!(parsed, Severity::Warning);
        assert_eq!(Severity::default(), Severity::Info);
    }

    #[test]
    fn test_alarm_summary_is_alarming() {
        let mut alarm = AlarmSummary {
            alarm_name: "apg-cluster-cpu".into(),
            state: "ALARM".into(),
            description: None,
            state_reason: None,
            state_updated: None,
            metric_name: None,
            namespace: None,
            statistic: None,
            threshold: None,
            comparison_operator: None,
            alarm_arn: None,
        };
        assert!(alarm.is_alarming());
        alarm.state = "OK".into();
        assert!(!alarm.is_alarming());
    }

    #[test]
    fn test_logs_query_status() {
        assert_eq!(LogsQueryStatus::parse("Running"), LogsQueryStatus::Running);
        assert!(LogsQueryStatus::parse("Scheduled").is_pending());
        assert!(!LogsQueryStatus::parse("Complete").is_pending());
        assert_eq!(LogsQueryStatus::parse("Paused"), LogsQueryStatus::Unknown);
    }

    #[test]
    fn test_alarms_failure_shape() {
        let err = DbError::config("no cluster identifier configured");
        let json = serde_json::to_value(AlarmsResult::failure(&err, None)).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error_kind"], "ConfigError");
        assert_eq!(json["count"], 0);
    }
}
