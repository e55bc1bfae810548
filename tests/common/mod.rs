//! In-memory stand-ins for Postgres, CloudWatch, CloudWatch Logs, RDS and SNS.
//!
//! `FakeDb` answers the catalog lookups the executor issues and records every
//! session and statement, so tests can assert on what reached the "server".

#![allow(dead_code)]

use dbops_mcp_server::actions::{INDEX_STATUS, RELATION_EXISTS, TABLE_IN_SCHEMA, TABLE_ON_SEARCH_PATH};
use dbops_mcp_server::db::{ConnectionProvider, SqlSession};
use dbops_mcp_server::diagnostics::queries::EXTENSION_INSTALLED;
use dbops_mcp_server::error::{DbError, DbResult};
use dbops_mcp_server::models::{
    AccessMode, AlarmQuery, AlarmSummary, AuroraCluster, JsonRow, LogGroupQuery, LogGroupSummary,
    LogsQuery, LogsQueryPage, LogsQueryStatus, MetricDatapoint, MetricQuery, QueryRows,
};
use dbops_mcp_server::monitoring::MonitoringApi;
use dbops_mcp_server::notify::AlertPublisher;
use serde_json::{Value as JsonValue, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub fn row(value: JsonValue) -> JsonRow {
    value.as_object().cloned().unwrap_or_default()
}

pub fn rows(columns: &[&str], values: Vec<JsonValue>) -> QueryRows {
    QueryRows::new(
        columns.iter().map(|c| c.to_string()).collect(),
        values.into_iter().map(row).collect(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub mode: AccessMode,
    pub sql: String,
    pub params: Vec<String>,
    /// Sent through `execute` rather than `query`
    pub executed: bool,
}

#[derive(Debug, Default)]
struct DbState {
    /// (schema, table)
    tables: HashSet<(String, String)>,
    search_path: Vec<String>,
    /// (schema, index) -> valid
    indexes: HashMap<(String, String), bool>,
    extensions: HashSet<String>,
    canned: HashMap<String, QueryRows>,
    statements: Vec<Statement>,
    opened: Vec<AccessMode>,
    closed: usize,
    refuse_connections: bool,
    /// Next CREATE INDEX fails, leaving an invalid index behind
    fail_next_build: bool,
}

/// Shared handle; clones see the same state.
#[derive(Debug, Clone)]
pub struct FakeDb {
    state: Arc<Mutex<DbState>>,
}

impl Default for FakeDb {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDb {
    pub fn new() -> Self {
        let state = DbState {
            search_path: vec!["public".to_string()],
            ..DbState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_table(self, schema: &str, table: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .tables
            .insert((schema.to_string(), table.to_string()));
        self
    }

    pub fn with_extension(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .extensions
            .insert(name.to_string());
        self
    }

    /// Rows returned for an exact SQL text.
    pub fn with_rows(self, sql: &str, result: QueryRows) -> Self {
        self.state
            .lock()
            .unwrap()
            .canned
            .insert(sql.to_string(), result);
        self
    }

    pub fn refusing_connections(self) -> Self {
        self.state.lock().unwrap().refuse_connections = true;
        self
    }

    pub fn failing_next_build(self) -> Self {
        self.state.lock().unwrap().fail_next_build = true;
        self
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.state.lock().unwrap().statements.clone()
    }

    /// Statements sent through `execute` (DDL and maintenance).
    pub fn executed(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|s| s.executed)
            .map(|s| s.sql)
            .collect()
    }

    pub fn opened_modes(&self) -> Vec<AccessMode> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opened.len()
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    pub fn index_count(&self, schema: &str, index: &str) -> usize {
        let state = self.state.lock().unwrap();
        usize::from(state.indexes.contains_key(&(schema.to_string(), index.to_string())))
    }

    pub fn index_valid(&self, schema: &str, index: &str) -> Option<bool> {
        self.state
            .lock()
            .unwrap()
            .indexes
            .get(&(schema.to_string(), index.to_string()))
            .copied()
    }
}

impl ConnectionProvider for FakeDb {
    type Session = FakeSession;

    async fn connect(&self, mode: AccessMode) -> DbResult<FakeSession> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_connections {
            return Err(DbError::connection(
                "connection refused",
                "Check that the database host is reachable",
            ));
        }
        state.opened.push(mode);
        Ok(FakeSession {
            db: self.clone(),
            mode,
        })
    }
}

pub struct FakeSession {
    db: FakeDb,
    mode: AccessMode,
}

impl FakeSession {
    fn record(&self, sql: &str, params: &[&str], executed: bool) {
        self.db.state.lock().unwrap().statements.push(Statement {
            mode: self.mode,
            sql: sql.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            executed,
        });
    }
}

impl SqlSession for FakeSession {
    async fn query(&mut self, sql: &str, params: &[&str]) -> DbResult<QueryRows> {
        self.record(sql, params, false);
        let state = self.db.state.lock().unwrap();

        if sql == TABLE_IN_SCHEMA {
            let key = (params[0].to_string(), params[1].to_string());
            return Ok(if state.tables.contains(&key) {
                rows(&["table_schema"], vec![json!({"table_schema": key.0})])
            } else {
                rows(&["table_schema"], vec![])
            });
        }
        if sql == TABLE_ON_SEARCH_PATH {
            let found = state
                .search_path
                .iter()
                .find(|schema| state.tables.contains(&((*schema).clone(), params[0].to_string())));
            return Ok(match found {
                Some(schema) => rows(&["table_schema"], vec![json!({"table_schema": schema})]),
                None => rows(&["table_schema"], vec![]),
            });
        }
        if sql == RELATION_EXISTS {
            let key = (params[0].to_string(), params[1].to_string());
            let kind = if state.indexes.contains_key(&key) {
                Some("index")
            } else if state.tables.contains(&key) {
                Some("table")
            } else {
                None
            };
            let columns = ["relation_name", "relation_kind"];
            return Ok(match kind {
                Some(kind) => rows(
                    &columns,
                    vec![json!({"relation_name": key.1, "relation_kind": kind})],
                ),
                None => rows(&columns, vec![]),
            });
        }
        if sql == INDEX_STATUS {
            let columns = ["index_name", "index_definition", "is_valid", "index_bytes"];
            let key = (params[0].to_string(), params[1].to_string());
            return Ok(match state.indexes.get(&key) {
                Some(valid) => rows(
                    &columns,
                    vec![json!({
                        "index_name": key.1,
                        "index_definition": format!("CREATE INDEX {} ON {}.t USING btree (c)", key.1, key.0),
                        "is_valid": valid,
                        "index_bytes": 16384
                    })],
                ),
                None => rows(&columns, vec![]),
            });
        }
        if sql == EXTENSION_INSTALLED {
            return Ok(if state.extensions.contains(params[0]) {
                rows(&["version"], vec![json!({"version": "1.10"})])
            } else {
                rows(&["version"], vec![])
            });
        }

        Ok(state.canned.get(sql).cloned().unwrap_or_default())
    }

    async fn execute(&mut self, sql: &str) -> DbResult<u64> {
        self.record(sql, &[], true);
        if self.mode.is_read_only() {
            return Err(DbError::query(
                "cannot execute statement in a read-only transaction",
                Some("25006".to_string()),
                "Run mutations on a read-write session",
            ));
        }

        let mut state = self.db.state.lock().unwrap();
        if sql.starts_with("CREATE INDEX CONCURRENTLY") {
            // CREATE INDEX CONCURRENTLY "name" ON "schema"."table" (...)
            let quoted: Vec<&str> = sql.split('"').collect();
            let (index, schema) = (quoted[1].to_string(), quoted[3].to_string());
            if std::mem::take(&mut state.fail_next_build) {
                state.indexes.insert((schema, index), false);
                return Err(DbError::query(
                    "could not create unique index",
                    Some("23505".to_string()),
                    "Remove the duplicate rows before retrying",
                ));
            }
            state.indexes.insert((schema, index), true);
        }
        Ok(0)
    }

    async fn close(self) {
        self.db.state.lock().unwrap().closed += 1;
    }
}

pub fn alarm(name: &str, state: &str) -> AlarmSummary {
    AlarmSummary {
        alarm_name: name.to_string(),
        state: state.to_string(),
        description: None,
        state_reason: None,
        state_updated: None,
        metric_name: Some("CPUUtilization".to_string()),
        namespace: Some("AWS/RDS".to_string()),
        statistic: Some("Average".to_string()),
        threshold: Some(80.0),
        comparison_operator: Some("GreaterThanThreshold".to_string()),
        alarm_arn: None,
    }
}

pub fn datapoint(timestamp: &str, average: f64) -> MetricDatapoint {
    MetricDatapoint {
        average: Some(average),
        unit: Some("Percent".to_string()),
        ..MetricDatapoint::at(timestamp)
    }
}

#[derive(Debug, Default)]
struct MonitoringState {
    alarms: Vec<AlarmSummary>,
    series: HashMap<String, Vec<MetricDatapoint>>,
    failing_metrics: HashSet<String>,
    alarms_fail: bool,
    alarm_queries: Vec<AlarmQuery>,
    metric_queries: Vec<MetricQuery>,
    log_groups: Vec<LogGroupSummary>,
    log_group_queries: Vec<LogGroupQuery>,
    log_rows: Vec<JsonRow>,
    pending_polls: usize,
    final_logs_status: Option<LogsQueryStatus>,
    logs_fail: bool,
    logs_queries: Vec<LogsQuery>,
    result_polls: usize,
    clusters: Vec<AuroraCluster>,
    clusters_fail: bool,
}

pub fn log_group(name: &str, stored_bytes: i64) -> LogGroupSummary {
    LogGroupSummary {
        log_group_name: name.to_string(),
        creation_time: Some("2026-01-05T08:00:00Z".to_string()),
        retention_in_days: Some(7),
        stored_bytes,
        metric_filter_count: 0,
    }
}

pub fn cluster(id: &str, engine: &str, writer: Option<&str>, readers: &[&str]) -> AuroraCluster {
    AuroraCluster {
        cluster_identifier: id.to_string(),
        engine: engine.to_string(),
        engine_version: Some("16.4".to_string()),
        status: Some("available".to_string()),
        endpoint: Some(format!("{id}.cluster-abc.us-west-2.rds.amazonaws.com")),
        reader_endpoint: None,
        writer_instance: writer.map(str::to_string),
        reader_instances: readers.iter().map(|r| r.to_string()).collect(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeMonitoring {
    state: Arc<Mutex<MonitoringState>>,
}

impl FakeMonitoring {
    pub fn with_alarm(self, alarm: AlarmSummary) -> Self {
        self.state.lock().unwrap().alarms.push(alarm);
        self
    }

    pub fn with_series(self, metric: &str, points: Vec<MetricDatapoint>) -> Self {
        self.state
            .lock()
            .unwrap()
            .series
            .insert(metric.to_string(), points);
        self
    }

    pub fn failing_metric(self, metric: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_metrics
            .insert(metric.to_string());
        self
    }

    pub fn failing_alarms(self) -> Self {
        self.state.lock().unwrap().alarms_fail = true;
        self
    }

    pub fn alarm_queries(&self) -> Vec<AlarmQuery> {
        self.state.lock().unwrap().alarm_queries.clone()
    }

    pub fn metric_queries(&self) -> Vec<MetricQuery> {
        self.state.lock().unwrap().metric_queries.clone()
    }

    pub fn with_log_group(self, group: LogGroupSummary) -> Self {
        self.state.lock().unwrap().log_groups.push(group);
        self
    }

    /// Answer logs queries with `rows` after `pending_polls` Running answers.
    pub fn with_log_rows(self, rows: Vec<JsonRow>, pending_polls: usize) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.log_rows = rows;
            state.pending_polls = pending_polls;
        }
        self
    }

    pub fn ending_logs_query_with(self, status: LogsQueryStatus) -> Self {
        self.state.lock().unwrap().final_logs_status = Some(status);
        self
    }

    pub fn failing_logs(self) -> Self {
        self.state.lock().unwrap().logs_fail = true;
        self
    }

    pub fn with_cluster(self, cluster: AuroraCluster) -> Self {
        self.state.lock().unwrap().clusters.push(cluster);
        self
    }

    pub fn failing_clusters(self) -> Self {
        self.state.lock().unwrap().clusters_fail = true;
        self
    }

    pub fn log_group_queries(&self) -> Vec<LogGroupQuery> {
        self.state.lock().unwrap().log_group_queries.clone()
    }

    pub fn logs_queries(&self) -> Vec<LogsQuery> {
        self.state.lock().unwrap().logs_queries.clone()
    }

    pub fn result_polls(&self) -> usize {
        self.state.lock().unwrap().result_polls
    }
}

impl MonitoringApi for FakeMonitoring {
    async fn describe_alarms(&self, query: &AlarmQuery) -> DbResult<Vec<AlarmSummary>> {
        let mut state = self.state.lock().unwrap();
        state.alarm_queries.push(query.clone());
        if state.alarms_fail {
            return Err(DbError::query(
                "CloudWatch DescribeAlarms failed: AccessDenied",
                None,
                "Check the IAM policy allows cloudwatch:DescribeAlarms",
            ));
        }
        Ok(state
            .alarms
            .iter()
            .filter(|a| {
                query
                    .name_prefix
                    .as_deref()
                    .is_none_or(|p| a.alarm_name.starts_with(p))
            })
            .filter(|a| query.state.is_none_or(|s| a.state == s.as_str()))
            .take(query.max_records as usize)
            .cloned()
            .collect())
    }

    async fn get_metric_statistics(&self, query: &MetricQuery) -> DbResult<Vec<MetricDatapoint>> {
        let mut state = self.state.lock().unwrap();
        state.metric_queries.push(query.clone());
        if state.failing_metrics.contains(&query.metric_name) {
            return Err(DbError::connection(
                "CloudWatch GetMetricStatistics failed: dispatch failure",
                "Check network access to the CloudWatch endpoint",
            ));
        }
        Ok(state
            .series
            .get(&query.metric_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn describe_log_groups(&self, query: &LogGroupQuery) -> DbResult<Vec<LogGroupSummary>> {
        let mut state = self.state.lock().unwrap();
        state.log_group_queries.push(query.clone());
        if state.logs_fail {
            return Err(DbError::query(
                "CloudWatch Logs DescribeLogGroups failed: AccessDenied",
                None,
                "Check the IAM policy allows logs:DescribeLogGroups",
            ));
        }
        Ok(state
            .log_groups
            .iter()
            .filter(|g| {
                query
                    .name_prefix
                    .as_deref()
                    .is_none_or(|p| g.log_group_name.starts_with(p))
            })
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn start_logs_query(&self, query: &LogsQuery) -> DbResult<String> {
        let mut state = self.state.lock().unwrap();
        state.logs_queries.push(query.clone());
        if state.logs_fail {
            return Err(DbError::query(
                "CloudWatch Logs StartQuery failed: ResourceNotFoundException",
                None,
                "Check the log group name",
            ));
        }
        Ok(format!("q-{}", state.logs_queries.len()))
    }

    async fn logs_query_results(&self, _query_id: &str) -> DbResult<LogsQueryPage> {
        let mut state = self.state.lock().unwrap();
        state.result_polls += 1;
        if state.result_polls <= state.pending_polls {
            return Ok(LogsQueryPage {
                status: LogsQueryStatus::Running,
                rows: Vec::new(),
            });
        }
        let status = state.final_logs_status.unwrap_or(LogsQueryStatus::Complete);
        Ok(LogsQueryPage {
            status,
            rows: state.log_rows.clone(),
        })
    }

    async fn describe_db_clusters(&self) -> DbResult<Vec<AuroraCluster>> {
        let state = self.state.lock().unwrap();
        if state.clusters_fail {
            return Err(DbError::connection(
                "RDS DescribeDBClusters could not reach the endpoint: dispatch failure",
                "Check network access to the AWS endpoint and the configured region",
            ));
        }
        Ok(state.clusters.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic_arn: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct FakePublisher {
    published: Arc<Mutex<Vec<Published>>>,
}

impl FakePublisher {
    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

impl AlertPublisher for FakePublisher {
    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> DbResult<String> {
        let mut published = self.published.lock().unwrap();
        published.push(Published {
            topic_arn: topic_arn.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        });
        Ok(format!("msg-{}", published.len()))
    }
}
