//! MCP server integration module.
//!
//! This module provides the integration between the MCP protocol and
//! the diagnostic, maintenance and monitoring tool handlers using the rmcp framework.

pub mod service;

pub use service::{DbOpsService, ServiceContext};
