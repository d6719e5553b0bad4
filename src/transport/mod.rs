//! Transport layer.
//!
//! Two surfaces expose the tool dispatcher:
//! - Stdio: line-oriented JSON-RPC (MCP) for CLI integration
//! - HTTP: REST facade for web clients
//!
//! Both call through the same dispatcher, so tool resolution and error
//! presentation behave identically regardless of surface.

pub mod http;
pub mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use crate::error::CrmResult;
use std::future::Future;

/// Trait for transport implementations.
pub trait Transport: Send + Sync {
    /// Start the transport and begin handling requests.
    ///
    /// This method should block until the transport is shut down.
    fn run(&self) -> impl Future<Output = CrmResult<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}
