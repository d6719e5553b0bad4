//! Error types for the CRM MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error
//! handling. The transient/permanent split drives the retry combinator: only
//! transient failures are worth another attempt.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("Query failed after {attempts} attempts: {message}")]
    QueryExecution { attempts: u32, message: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// MySQL error code, e.g. "1213" for a deadlock
        code: Option<String>,
    },

    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    #[error("Unknown tool '{name}'. Known tools: {}", .known.join(", "))]
    UnknownTool { name: String, known: Vec<String> },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CrmError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a query-execution error carrying the attempt count and the
    /// last underlying failure.
    pub fn query_execution(attempts: u32, message: impl Into<String>) -> Self {
        Self::QueryExecution {
            attempts,
            message: message.into(),
        }
    }

    /// Create a database error with an optional MySQL error code.
    pub fn database(message: impl Into<String>, code: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            code,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error for a business entity.
    pub fn not_found(entity: impl Into<String>, key: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    /// Create an unknown-tool error carrying the registered names.
    pub fn unknown_tool(name: impl Into<String>, known: Vec<String>) -> Self {
        Self::UnknownTool {
            name: name.into(),
            known,
        }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check whether another attempt could succeed.
    ///
    /// Connection drops and timeouts are transient, as are the MySQL
    /// deadlock/lock-wait/serialization failures. Malformed statements and
    /// constraint violations are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } => true,
            Self::Database { code: Some(c), .. } => {
                matches!(c.as_str(), "1205" | "1213" | "40001")
            }
            _ => false,
        }
    }
}

/// Convert sqlx errors to CrmError.
impl From<sqlx::Error> for CrmError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => CrmError::connection(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                CrmError::database(db_err.message(), code)
            }
            sqlx::Error::PoolTimedOut => CrmError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => CrmError::connection("Connection pool is closed"),
            sqlx::Error::Io(io_err) => CrmError::connection(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => CrmError::connection(format!("TLS error: {}", tls_err)),
            sqlx::Error::Protocol(msg) => CrmError::connection(format!("Protocol error: {}", msg)),
            sqlx::Error::RowNotFound => CrmError::not_found("Row", "query returned no rows"),
            sqlx::Error::ColumnNotFound(col) => {
                CrmError::internal(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => CrmError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                CrmError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => CrmError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => CrmError::internal("Database worker crashed"),
            _ => CrmError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for CRM operations.
pub type CrmResult<T> = Result<T, CrmError>;

/// Convert CrmError to MCP ErrorData for semantic error categorization.
///
/// Unknown tools and missing entities map to resource_not_found, bad
/// arguments to invalid_params, everything else to internal_error. The same
/// split drives the REST facade's status codes, so both transports present
/// one error contract.
impl From<CrmError> for rmcp::ErrorData {
    fn from(err: CrmError) -> Self {
        match &err {
            CrmError::Validation { .. } => rmcp::ErrorData::invalid_params(err.to_string(), None),

            CrmError::NotFound { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), None)
            }
            CrmError::UnknownTool { known, .. } => rmcp::ErrorData::resource_not_found(
                err.to_string(),
                Some(serde_json::json!({ "known_tools": known })),
            ),

            CrmError::Database { code, .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                code.as_ref().map(|c| serde_json::json!({ "mysql_code": c })),
            ),

            CrmError::Connection { .. }
            | CrmError::Timeout { .. }
            | CrmError::QueryExecution { .. }
            | CrmError::Transaction { .. }
            | CrmError::Internal { .. } => rmcp::ErrorData::internal_error(err.to_string(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CrmError::query_execution(3, "server has gone away");
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn test_unknown_tool_lists_known_names() {
        let err = CrmError::unknown_tool("frobnicate", vec!["list_customers".into()]);
        assert!(err.to_string().contains("list_customers"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(CrmError::connection("refused").is_transient());
        assert!(CrmError::timeout("query", 30).is_transient());
        assert!(CrmError::database("deadlock", Some("1213".into())).is_transient());
        assert!(CrmError::database("lock wait", Some("1205".into())).is_transient());
        assert!(!CrmError::database("syntax error", Some("1064".into())).is_transient());
        assert!(!CrmError::database("no code", None).is_transient());
        assert!(!CrmError::validation("missing field").is_transient());
        assert!(!CrmError::query_execution(3, "gave up").is_transient());
    }

    // Tests for From<CrmError> for rmcp::ErrorData

    #[test]
    fn test_validation_maps_to_invalid_params() {
        let err = CrmError::validation("bad input");
        let mcp_err: rmcp::ErrorData = err.into();
        // invalid_params uses -32602
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_not_found_maps_to_resource_not_found() {
        let err = CrmError::not_found("Customer", 42);
        let mcp_err: rmcp::ErrorData = err.into();
        // resource_not_found uses -32002 in rmcp
        assert_eq!(mcp_err.code.0, -32002);
    }

    #[test]
    fn test_unknown_tool_maps_to_resource_not_found() {
        let err = CrmError::unknown_tool("nope", vec!["list_leads".into()]);
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32002);
        let data = mcp_err.data.unwrap();
        assert_eq!(data["known_tools"][0], "list_leads");
    }

    #[test]
    fn test_query_execution_maps_to_internal_error() {
        let err = CrmError::query_execution(3, "gone away");
        let mcp_err: rmcp::ErrorData = err.into();
        // internal_error uses -32603
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_database_error_carries_mysql_code() {
        let err = CrmError::database("deadlock found", Some("1213".to_string()));
        let mcp_err: rmcp::ErrorData = err.into();
        let data = mcp_err.data.unwrap();
        assert_eq!(data["mysql_code"], "1213");
    }
}
