//! Stdio transport.
//!
//! Reads JSON-RPC messages from stdin and writes responses to stdout,
//! following the MCP protocol specification. This is the standard mode for
//! CLI-based integrations.

use crate::db::ConnectionManager;
use crate::error::CrmResult;
use crate::mcp::CrmService;
use crate::tools::Dispatcher;
use crate::transport::Transport;
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

pub struct StdioTransport {
    dispatcher: Arc<Dispatcher>,
    connection_manager: Arc<ConnectionManager>,
}

impl StdioTransport {
    /// Create a new stdio transport.
    ///
    /// # Arguments
    ///
    /// * `dispatcher` - Shared tool dispatcher
    /// * `connection_manager` - Shared database client, closed on shutdown
    pub fn new(dispatcher: Arc<Dispatcher>, connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            dispatcher,
            connection_manager,
        }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> CrmResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = CrmService::new(self.dispatcher.clone());

        let transport = stdio();
        let running_service = service.serve(transport).await.map_err(|e| {
            crate::error::CrmError::internal(format!("Failed to start stdio transport: {}", e))
        })?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Stdio transport error");
                        return Err(crate::error::CrmError::internal(format!(
                            "Stdio transport error: {}",
                            e
                        )));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            // Spawn a task to listen for second signal and force exit
            tokio::spawn(async {
                wait_for_signal().await;
                tracing::warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        // Close the database pool on shutdown
        info!("Closing database pool");
        self.connection_manager.close().await;

        if shutdown_requested {
            // Force exit since stdio may still be blocking on stdin
            // tokio::select! cannot interrupt blocking stdin reads
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ConnectionManager;
    use crate::tools::build_registry;

    #[tokio::test]
    async fn test_stdio_transport_creation() {
        let manager =
            Arc::new(ConnectionManager::from_url("mysql://crm@127.0.0.1:1/crm", 1).unwrap());
        let dispatcher = Arc::new(Dispatcher::new(build_registry().unwrap(), manager.clone()));
        let transport = StdioTransport::new(dispatcher, manager);
        assert_eq!(transport.name(), "stdio");
    }
}
