//! Configuration handling for the CRM MCP Server.
//!
//! This module provides configuration management via CLI arguments and
//! environment variables. The database target is described by discrete
//! host/port/credential fields; a tenant identifier selects which CRM
//! database a deployment instance talks to.

use clap::{Parser, ValueEnum};
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_DB_HOST: &str = "127.0.0.1";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DATABASE: &str = "crm";
pub const TENANT_DATABASE_PREFIX: &str = "crm_";

// Pool configuration defaults
pub const DEFAULT_POOL_SIZE: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

// Retry defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

/// Transport mode for the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// REST facade over HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// CRM MCP Server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "crm-mcp-server", version, about)]
pub struct Config {
    /// Transport to expose the tool surface on
    #[arg(long, value_enum, default_value_t = TransportMode::Stdio, env = "CRM_TRANSPORT")]
    pub transport: TransportMode,

    /// MySQL server host
    #[arg(long, default_value = DEFAULT_DB_HOST, env = "CRM_DB_HOST")]
    pub db_host: String,

    /// MySQL server port
    #[arg(long, default_value_t = DEFAULT_DB_PORT, env = "CRM_DB_PORT")]
    pub db_port: u16,

    /// MySQL user
    #[arg(long, default_value = "crm", env = "CRM_DB_USER")]
    pub db_user: String,

    /// MySQL password (sensitive - never logged)
    #[arg(long, default_value = "", env = "CRM_DB_PASSWORD", hide_env_values = true)]
    pub db_password: String,

    /// Explicit database name. Overrides --tenant when set.
    #[arg(long, env = "CRM_DB_NAME")]
    pub db_name: Option<String>,

    /// Tenant identifier. Selects database "crm_<tenant>".
    #[arg(long, env = "CRM_TENANT")]
    pub tenant: Option<String>,

    /// Maximum connections in the pool
    #[arg(long, default_value_t = DEFAULT_POOL_SIZE, env = "CRM_POOL_SIZE")]
    pub pool_size: u32,

    /// Per-statement timeout in seconds
    #[arg(long, default_value_t = DEFAULT_QUERY_TIMEOUT_SECS, env = "CRM_QUERY_TIMEOUT_SECS")]
    pub query_timeout_secs: u64,

    /// Maximum attempts per read/insert operation
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES, env = "CRM_MAX_RETRIES")]
    pub max_retries: u32,

    /// Base retry backoff in milliseconds (delay before attempt k is base * k)
    #[arg(long, default_value_t = DEFAULT_RETRY_BASE_DELAY_MS, env = "CRM_RETRY_BASE_DELAY_MS")]
    pub retry_base_delay_ms: u64,

    /// Host to bind the REST facade to
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "CRM_HTTP_HOST")]
    pub http_host: String,

    /// Port to bind the REST facade to
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "CRM_HTTP_PORT")]
    pub http_port: u16,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, default_value = "info", env = "CRM_LOG_LEVEL")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false, env = "CRM_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Resolve the database settings for this deployment instance.
    ///
    /// Name resolution: an explicit `--db-name` wins; otherwise `--tenant t`
    /// targets `crm_t`; otherwise the default `crm` database.
    pub fn database_settings(&self) -> Result<DatabaseSettings, String> {
        if self.pool_size == 0 {
            return Err("pool_size must be greater than 0".to_string());
        }
        if self.query_timeout_secs == 0 {
            return Err("query_timeout_secs must be greater than 0".to_string());
        }
        let database = resolve_database_name(self.db_name.as_deref(), self.tenant.as_deref())?;
        Ok(DatabaseSettings {
            host: self.db_host.clone(),
            port: self.db_port,
            username: self.db_user.clone(),
            password: self.db_password.clone(),
            database,
            pool_size: self.pool_size,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            query_timeout: Duration::from_secs(self.query_timeout_secs),
        })
    }
}

/// Resolved database target. Immutable after construction.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Sensitive - never logged.
    pub password: String,
    pub database: String,
    pub pool_size: u32,
    pub acquire_timeout: Duration,
    pub query_timeout: Duration,
}

/// Map the (db_name, tenant) pair to a concrete database name.
fn resolve_database_name(
    db_name: Option<&str>,
    tenant: Option<&str>,
) -> Result<String, String> {
    if let Some(name) = db_name {
        let name = name.trim();
        if name.is_empty() {
            return Err("db_name cannot be empty".to_string());
        }
        return Ok(name.to_string());
    }

    match tenant {
        Some(t) => {
            let t = t.trim();
            if t.is_empty() {
                return Err("tenant cannot be empty".to_string());
            }
            if !t.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(format!(
                    "tenant '{}' contains characters outside [a-zA-Z0-9_]",
                    t
                ));
            }
            Ok(format!("{}{}", TENANT_DATABASE_PREFIX, t.to_lowercase()))
        }
        None => Ok(DEFAULT_DATABASE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config::parse_from(["crm-mcp-server"])
    }

    #[test]
    fn test_defaults() {
        let config = base_config();
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.retry_base_delay_ms, DEFAULT_RETRY_BASE_DELAY_MS);
    }

    #[test]
    fn test_database_settings_default_name() {
        let settings = base_config().database_settings().unwrap();
        assert_eq!(settings.database, "crm");
        assert_eq!(settings.pool_size, 10);
    }

    #[test]
    fn test_tenant_selects_database() {
        let config = Config::parse_from(["crm-mcp-server", "--tenant", "Acme"]);
        let settings = config.database_settings().unwrap();
        assert_eq!(settings.database, "crm_acme");
    }

    #[test]
    fn test_explicit_db_name_wins_over_tenant() {
        let config = Config::parse_from([
            "crm-mcp-server",
            "--tenant",
            "acme",
            "--db-name",
            "legacy_crm",
        ]);
        let settings = config.database_settings().unwrap();
        assert_eq!(settings.database, "legacy_crm");
    }

    #[test]
    fn test_tenant_with_bad_characters_rejected() {
        let config = Config::parse_from(["crm-mcp-server", "--tenant", "acme; DROP"]);
        assert!(config.database_settings().is_err());
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let config = Config::parse_from(["crm-mcp-server", "--pool-size", "0"]);
        assert!(config.database_settings().is_err());
    }

    #[test]
    fn test_transport_mode_display() {
        assert_eq!(TransportMode::Stdio.to_string(), "stdio");
        assert_eq!(TransportMode::Http.to_string(), "http");
    }
}
