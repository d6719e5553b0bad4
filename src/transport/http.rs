//! HTTP transport: REST facade over the tool dispatcher.
//!
//! Endpoints:
//! - `GET /health` - non-throwing database probe
//! - `GET /api/tools` - advertised tool descriptors
//! - `POST /api/tools/{tool}` - invoke a tool with `{"arguments": {...}}`
//! - `POST /api/customers|invoices|projects|tasks|leads` - convenience
//!   routes, each bound to one fixed list tool
//!
//! Every response uses the same envelope:
//! `{success, tool?, data?, error?, timestamp}`. Errors carry a status code
//! matching the dispatcher's error taxonomy, so the REST surface and the
//! MCP surface present one contract.

use crate::db::ConnectionManager;
use crate::error::{CrmError, CrmResult};
use crate::tools::Dispatcher;
use crate::tools::registry::JsonObject;
use crate::transport::Transport;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Uniform REST response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ApiResponse {
    fn ok(tool: Option<String>, data: JsonValue) -> Self {
        Self {
            success: true,
            tool,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    fn err(tool: Option<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            tool,
            data: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Request body for tool invocation routes.
#[derive(Debug, Default, Deserialize)]
struct InvokeBody {
    #[serde(default)]
    arguments: JsonObject,
}

/// Parse the optional invocation body. An empty body means no arguments; a
/// malformed one is a validation failure in the uniform envelope rather
/// than a framework rejection.
fn parse_arguments(body: &[u8]) -> Result<JsonObject, CrmError> {
    if body.is_empty() {
        return Ok(JsonObject::new());
    }
    let parsed: InvokeBody = serde_json::from_slice(body)
        .map_err(|e| CrmError::validation(format!("Invalid request body: {}", e)))?;
    Ok(parsed.arguments)
}

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    connection_manager: Arc<ConnectionManager>,
}

/// Map the error taxonomy to a REST status code.
fn status_for(err: &CrmError) -> StatusCode {
    match err {
        CrmError::Validation { .. } => StatusCode::BAD_REQUEST,
        CrmError::NotFound { .. } | CrmError::UnknownTool { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse>) {
    if state.connection_manager.test_connection().await {
        (
            StatusCode::OK,
            Json(ApiResponse::ok(None, serde_json::json!({ "database": "up" }))),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::err(None, "Database probe failed")),
        )
    }
}

async fn list_tools(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse>) {
    let tools = state.dispatcher.list_tools();
    let data = serde_json::json!({ "tools": tools, "count": tools.len() });
    (StatusCode::OK, Json(ApiResponse::ok(None, data)))
}

/// Shared invocation path for the generic and convenience routes.
async fn invoke(
    state: &AppState,
    tool: &str,
    args: JsonObject,
) -> (StatusCode, Json<ApiResponse>) {
    match state.dispatcher.invoke(tool, args).await {
        Ok(response) => {
            let data = response
                .structured
                .unwrap_or_else(|| serde_json::json!({ "content": response.content }));
            (
                StatusCode::OK,
                Json(ApiResponse::ok(Some(tool.to_string()), data)),
            )
        }
        Err(err) => (
            status_for(&err),
            Json(ApiResponse::err(Some(tool.to_string()), err.to_string())),
        ),
    }
}

async fn invoke_tool(
    State(state): State<AppState>,
    Path(tool): Path<String>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse>) {
    match parse_arguments(&body) {
        Ok(args) => invoke(&state, &tool, args).await,
        Err(err) => (
            status_for(&err),
            Json(ApiResponse::err(Some(tool), err.to_string())),
        ),
    }
}

/// Build a convenience handler bound to one fixed tool name.
macro_rules! convenience_route {
    ($name:ident, $tool:literal) => {
        async fn $name(
            State(state): State<AppState>,
            body: Bytes,
        ) -> (StatusCode, Json<ApiResponse>) {
            match parse_arguments(&body) {
                Ok(args) => invoke(&state, $tool, args).await,
                Err(err) => (
                    status_for(&err),
                    Json(ApiResponse::err(Some($tool.to_string()), err.to_string())),
                ),
            }
        }
    };
}

convenience_route!(customers_route, "list_customers");
convenience_route!(invoices_route, "list_invoices");
convenience_route!(projects_route, "list_projects");
convenience_route!(tasks_route, "list_tasks");
convenience_route!(leads_route, "list_leads");

pub struct HttpTransport {
    dispatcher: Arc<Dispatcher>,
    connection_manager: Arc<ConnectionManager>,
    /// Host to bind to
    host: String,
    /// Port to bind to
    port: u16,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        connection_manager: Arc<ConnectionManager>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            dispatcher,
            connection_manager,
            host: host.into(),
            port,
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the axum router. Exposed so tests can drive it in-process.
    pub fn router(&self) -> Router {
        let state = AppState {
            dispatcher: self.dispatcher.clone(),
            connection_manager: self.connection_manager.clone(),
        };

        Router::new()
            .route("/health", get(health))
            .route("/api/tools", get(list_tools))
            .route("/api/tools/{tool}", post(invoke_tool))
            .route("/api/customers", post(customers_route))
            .route("/api/invoices", post(invoices_route))
            .route("/api/projects", post(projects_route))
            .route("/api/tasks", post(tasks_route))
            .route("/api/leads", post(leads_route))
            .with_state(state)
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> CrmResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting REST facade on {}", bind_addr);

        let app = self.router();

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            CrmError::connection(format!(
                "Failed to bind to {}: {}. Check that the port is available",
                bind_addr, e
            ))
        })?;

        info!("REST endpoints ready");

        // Graceful shutdown: open connections may keep the server alive, so
        // force exit after a timeout once the shutdown signal is received
        const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();

        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(CrmError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                // Wait for shutdown signal, then wait for either timeout or second signal
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {
                // Timeout or second signal reached - server will be dropped
            }
        }

        info!("Closing database pool");
        self.connection_manager.close().await;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::build_registry;

    fn transport() -> HttpTransport {
        let manager =
            Arc::new(ConnectionManager::from_url("mysql://crm@127.0.0.1:1/crm", 1).unwrap());
        let dispatcher = Arc::new(Dispatcher::new(build_registry().unwrap(), manager.clone()));
        HttpTransport::new(dispatcher, manager, "127.0.0.1", 8080)
    }

    #[tokio::test]
    async fn test_http_transport_creation() {
        let t = transport();
        assert_eq!(t.name(), "http");
        assert_eq!(t.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_status_mapping_follows_taxonomy() {
        assert_eq!(
            status_for(&CrmError::validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&CrmError::not_found("Customer", 1)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&CrmError::unknown_tool("x", vec![])),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&CrmError::query_execution(3, "gone")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_router_builds() {
        let _router = transport().router();
    }

    #[test]
    fn test_parse_arguments_empty_body_means_no_arguments() {
        assert!(parse_arguments(b"").unwrap().is_empty());
    }

    #[test]
    fn test_parse_arguments_extracts_bag() {
        let args = parse_arguments(br#"{"arguments": {"limit": 5}}"#).unwrap();
        assert_eq!(args["limit"], 5);
    }

    #[test]
    fn test_parse_arguments_rejects_malformed_body() {
        assert!(matches!(
            parse_arguments(b"{nope"),
            Err(CrmError::Validation { .. })
        ));
    }
}
