//! Data models for the DBOps MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod monitoring;
pub mod mutation;
pub mod result;

// Re-export commonly used types
pub use connection::{AccessMode, ConnectionConfig, DEFAULT_PG_DATABASE, DEFAULT_PG_PORT};
pub use monitoring::{
    AlarmFilter, AlarmQuery, AlarmState, AlarmSummary, AlarmsResult, AuroraCluster,
    ClustersResult, HealthInsight, LogGroupFilter, LogGroupQuery, LogGroupSummary,
    LogGroupsResult, LogsQuery, LogsQueryPage, LogsQueryResult, LogsQueryStatus, LogsRequest,
    MetricDatapoint, MetricDimension, MetricQuery, MetricRequest, MetricSeriesResult,
    NotificationResult, PerformanceMetricsResult, Severity, Statistic,
};
pub use mutation::{
    IndexSpec, MAX_IDENTIFIER_LEN, MutationKind, MutationReport, ResolvedTable, SafetyVerdict,
    TableRef, ValidatedIndex, derive_index_name, normalize_identifier, quote_identifier,
};
pub use result::{JsonRow, QueryResult, QueryRows, Status};
