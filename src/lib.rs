//! dbops MCP server library
//!
//! PostgreSQL diagnostics, safe maintenance mutations and Aurora monitoring
//! exposed as MCP (Model Context Protocol) tools.

pub mod actions;
pub mod auth;
pub mod aws;
pub mod config;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod mcp;
pub mod models;
pub mod monitoring;
pub mod notify;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::DbOpsService;
