//! MCP tool implementations.
//!
//! This module contains the tool handlers behind the MCP service:
//! - `diagnostics`: read-only catalog queries (bloat, unused indexes, slow queries...)
//! - `maintenance`: concurrent index builds, ANALYZE, VACUUM, SQL safety check
//! - `monitoring`: CloudWatch alarms and metrics, SNS notifications
//! - `format`: table/markdown rendering of diagnostic rows

pub mod diagnostics;
pub mod format;
pub mod maintenance;
pub mod monitoring;

pub use diagnostics::{
    DiagnosticInput, DiagnosticToolHandler, ListDiagnosticsOutput, RunDiagnosticInput,
};
pub use format::OutputFormat;
pub use maintenance::{
    AnalyzeInput, CreateIndexInput, MaintenanceToolHandler, ValidateSqlInput, VacuumInput,
};
pub use monitoring::{
    HoursBackInput, ListAlarmsInput, MonitoringToolHandler, NotificationToolHandler,
    SendNotificationInput,
};
