//! Database access layer.
//!
//! This module provides the resilient CRM database client:
//! - Bounded connection pool with per-attempt borrow/release discipline
//! - Bounded linear-backoff retry for read and insert paths
//! - Result sanitization before rows leave the data-access boundary
//! - SELECT builder with mechanical placeholder/parameter alignment
//! - MySQL row to JSON record decoding

pub mod params;
pub mod pool;
pub mod retry;
pub mod row;
pub mod sanitize;
pub mod sql;

pub use params::SqlParam;
pub use pool::{ConnectionManager, MySqlTransaction};
pub use retry::RetryPolicy;
pub use row::Record;
pub use sanitize::{REDACTION_MARKER, ResultSanitizer};
pub use sql::SelectBuilder;
