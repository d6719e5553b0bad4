//! CRM MCP Server Library
//!
//! This library exposes a legacy CRM database to automation agents as named
//! tools over MCP (stdio) and a REST facade, backed by a resilient MySQL
//! client with bounded pooling, retry, and result sanitization.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use db::ConnectionManager;
pub use error::CrmError;
pub use mcp::CrmService;
pub use tools::{Dispatcher, ToolRegistry};
