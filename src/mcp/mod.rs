//! MCP protocol layer.
//!
//! Exposes the tool dispatcher over the Model Context Protocol.

pub mod service;

pub use service::CrmService;
