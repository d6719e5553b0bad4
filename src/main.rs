//! CRM MCP Server - Main entry point.
//!
//! Resolves configuration, probes the database (fatal on failure), builds
//! the tool registry, and runs the selected transport.

use clap::Parser;
use crm_mcp_server::config::{Config, TransportMode};
use crm_mcp_server::db::{ConnectionManager, RetryPolicy};
use crm_mcp_server::tools::{Dispatcher, build_registry};
use crm_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        transport = %config.transport,
        "Starting CRM MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let settings = config.database_settings()?;
    info!(
        host = %settings.host,
        port = settings.port,
        database = %settings.database,
        "Resolved database target"
    );

    let retry = RetryPolicy::new(
        config.max_retries,
        Duration::from_millis(config.retry_base_delay_ms),
    );
    let connection_manager = Arc::new(ConnectionManager::connect(&settings, retry));

    // A failed probe is fatal: the process does not proceed without a
    // healthy backend.
    if !connection_manager.test_connection().await {
        error!(
            host = %settings.host,
            database = %settings.database,
            "Database probe failed, refusing to start"
        );
        eprintln!("Error: cannot reach the CRM database. Check host, credentials, and database name.");
        std::process::exit(1);
    }
    info!("Database probe succeeded");

    let registry = build_registry()?;
    info!(tools = registry.len(), "Tool registry built");

    let dispatcher = Arc::new(Dispatcher::new(registry, connection_manager.clone()));

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(dispatcher, connection_manager);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                dispatcher,
                connection_manager,
                &config.http_host,
                config.http_port,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
