//! AWS-backed [`MonitoringApi`]: CloudWatch metrics and alarms, CloudWatch
//! Logs, and RDS cluster discovery.

use super::MonitoringApi;
use crate::aws::sdk_error;
use crate::error::{DbError, DbResult};
use crate::models::{
    AlarmQuery, AlarmSummary, AuroraCluster, JsonRow, LogGroupQuery, LogGroupSummary, LogsQuery,
    LogsQueryPage, LogsQueryStatus, MetricDatapoint, MetricQuery,
};
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{
    Datapoint, Dimension, MetricAlarm, StateValue, Statistic as AwsStatistic,
};
use aws_sdk_cloudwatchlogs::types::{LogGroup, ResultField};
use aws_sdk_rds::types::DbCluster;
use chrono::SecondsFormat;
use serde_json::Value as JsonValue;
use tracing::debug;

/// `DescribeLogGroups` returns at most this many groups per page.
const LOG_GROUP_PAGE_SIZE: i32 = 50;

#[derive(Debug, Clone)]
pub struct CloudWatchMonitoring {
    client: aws_sdk_cloudwatch::Client,
    logs: aws_sdk_cloudwatchlogs::Client,
    rds: aws_sdk_rds::Client,
}

impl CloudWatchMonitoring {
    pub fn new(sdk_config: &aws_types::SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudwatch::Client::new(sdk_config),
            logs: aws_sdk_cloudwatchlogs::Client::new(sdk_config),
            rds: aws_sdk_rds::Client::new(sdk_config),
        }
    }
}

impl MonitoringApi for CloudWatchMonitoring {
    async fn describe_alarms(&self, query: &AlarmQuery) -> DbResult<Vec<AlarmSummary>> {
        let mut request = self
            .client
            .describe_alarms()
            .max_records(query.max_records);
        if let Some(prefix) = &query.name_prefix {
            request = request.alarm_name_prefix(prefix);
        }
        if let Some(state) = query.state {
            request = request.state_value(StateValue::from(state.as_str()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| sdk_error("CloudWatch", "DescribeAlarms", e))?;

        let alarms: Vec<AlarmSummary> = response.metric_alarms().iter().map(alarm_summary).collect();
        debug!(count = alarms.len(), "DescribeAlarms returned");
        Ok(alarms)
    }

    async fn get_metric_statistics(&self, query: &MetricQuery) -> DbResult<Vec<MetricDatapoint>> {
        let mut request = self
            .client
            .get_metric_statistics()
            .namespace(&query.namespace)
            .metric_name(&query.metric_name)
            .start_time(AwsDateTime::from_secs(query.start.timestamp()))
            .end_time(AwsDateTime::from_secs(query.end.timestamp()))
            .period(query.period_secs);
        for statistic in &query.statistics {
            request = request.statistics(AwsStatistic::from(statistic.as_str()));
        }
        if let Some(dimension) = &query.dimension {
            request = request.dimensions(
                Dimension::builder()
                    .name(&dimension.name)
                    .value(&dimension.value)
                    .build(),
            );
        }

        let response = request
            .send()
            .await
            .map_err(|e| sdk_error("CloudWatch", "GetMetricStatistics", e))?;

        Ok(response.datapoints().iter().map(datapoint).collect())
    }

    async fn describe_log_groups(&self, query: &LogGroupQuery) -> DbResult<Vec<LogGroupSummary>> {
        let wanted = usize::try_from(query.limit).unwrap_or_default();
        let mut groups = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let remaining = i32::try_from(wanted - groups.len()).unwrap_or(LOG_GROUP_PAGE_SIZE);
            let response = self
                .logs
                .describe_log_groups()
                .set_log_group_name_prefix(query.name_prefix.clone())
                .limit(remaining.min(LOG_GROUP_PAGE_SIZE))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("CloudWatch Logs", "DescribeLogGroups", e))?;

            groups.extend(response.log_groups().iter().map(log_group_summary));
            next_token = response.next_token().map(str::to_string);
            if groups.len() >= wanted || next_token.is_none() {
                break;
            }
        }
        debug!(count = groups.len(), "DescribeLogGroups returned");
        Ok(groups)
    }

    async fn start_logs_query(&self, query: &LogsQuery) -> DbResult<String> {
        let response = self
            .logs
            .start_query()
            .log_group_name(&query.log_group_name)
            .query_string(&query.query)
            .start_time(query.start.timestamp())
            .end_time(query.end.timestamp())
            .limit(query.limit)
            .send()
            .await
            .map_err(|e| sdk_error("CloudWatch Logs", "StartQuery", e))?;

        response
            .query_id()
            .map(str::to_string)
            .ok_or_else(|| DbError::internal("StartQuery returned no query id"))
    }

    async fn logs_query_results(&self, query_id: &str) -> DbResult<LogsQueryPage> {
        let response = self
            .logs
            .get_query_results()
            .query_id(query_id)
            .send()
            .await
            .map_err(|e| sdk_error("CloudWatch Logs", "GetQueryResults", e))?;

        let status = response
            .status()
            .map(|s| LogsQueryStatus::parse(s.as_str()))
            .unwrap_or(LogsQueryStatus::Unknown);
        let rows = response.results().iter().map(|r| log_row(r)).collect();
        Ok(LogsQueryPage { status, rows })
    }

    async fn describe_db_clusters(&self) -> DbResult<Vec<AuroraCluster>> {
        let mut clusters = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let response = self
                .rds
                .describe_db_clusters()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| sdk_error("RDS", "DescribeDBClusters", e))?;

            clusters.extend(response.db_clusters().iter().map(aurora_cluster));
            marker = response.marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        debug!(count = clusters.len(), "DescribeDBClusters returned");
        Ok(clusters)
    }
}

fn log_group_summary(group: &LogGroup) -> LogGroupSummary {
    LogGroupSummary {
        log_group_name: group.log_group_name().unwrap_or_default().to_string(),
        creation_time: group
            .creation_time()
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
        retention_in_days: group.retention_in_days(),
        stored_bytes: group.stored_bytes().unwrap_or_default(),
        metric_filter_count: group.metric_filter_count().unwrap_or_default(),
    }
}

fn log_row(fields: &[ResultField]) -> JsonRow {
    fields
        .iter()
        .filter_map(|f| {
            let value = f.value().map_or(JsonValue::Null, JsonValue::from);
            f.field().map(|name| (name.to_string(), value))
        })
        .collect()
}

fn aurora_cluster(cluster: &DbCluster) -> AuroraCluster {
    let mut writer_instance = None;
    let mut reader_instances = Vec::new();
    for member in cluster.db_cluster_members() {
        let Some(id) = member.db_instance_identifier() else {
            continue;
        };
        if member.is_cluster_writer().unwrap_or(false) {
            writer_instance = Some(id.to_string());
        } else {
            reader_instances.push(id.to_string());
        }
    }

    AuroraCluster {
        cluster_identifier: cluster.db_cluster_identifier().unwrap_or_default().to_string(),
        engine: cluster.engine().unwrap_or_default().to_string(),
        engine_version: cluster.engine_version().map(str::to_string),
        status: cluster.status().map(str::to_string),
        endpoint: cluster.endpoint().map(str::to_string),
        reader_endpoint: cluster.reader_endpoint().map(str::to_string),
        writer_instance,
        reader_instances,
    }
}

fn alarm_summary(alarm: &MetricAlarm) -> AlarmSummary {
    AlarmSummary {
        alarm_name: alarm.alarm_name().unwrap_or_default().to_string(),
        state: alarm
            .state_value()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        description: alarm.alarm_description().map(str::to_string),
        state_reason: alarm.state_reason().map(str::to_string),
        state_updated: alarm.state_updated_timestamp().and_then(rfc3339),
        metric_name: alarm.metric_name().map(str::to_string),
        namespace: alarm.namespace().map(str::to_string),
        statistic: alarm.statistic().map(|s| s.as_str().to_string()),
        threshold: alarm.threshold(),
        comparison_operator: alarm.comparison_operator().map(|c| c.as_str().to_string()),
        alarm_arn: alarm.alarm_arn().map(str::to_string),
    }
}

fn datapoint(point: &Datapoint) -> MetricDatapoint {
    let timestamp = point.timestamp().and_then(rfc3339).unwrap_or_default();
    MetricDatapoint {
        average: point.average(),
        maximum: point.maximum(),
        minimum: point.minimum(),
        sum: point.sum(),
        sample_count: point.sample_count(),
        unit: point.unit().map(|u| u.as_str().to_string()),
        ..MetricDatapoint::at(timestamp)
    }
}

fn rfc3339(ts: &AwsDateTime) -> Option<String> {
    chrono::DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}
