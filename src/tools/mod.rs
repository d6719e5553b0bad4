//! Tool implementations.
//!
//! This module contains the tool registry/dispatch machinery and the
//! business-domain tool collections:
//! - `registry`: tool descriptors and the name-indexed registry
//! - `dispatcher`: invocation routing and response normalization
//! - `customers`, `invoices`, `projects`, `tasks`, `leads`: thin SQL-filter
//!   builders over the fixed CRM tables

pub mod customers;
pub mod dispatcher;
pub mod invoices;
pub mod leads;
pub mod projects;
pub mod registry;
pub mod tasks;

pub use dispatcher::{ContentBlock, Dispatcher, ToolResponse};
pub use registry::{JsonObject, Tool, ToolDescriptor, ToolRegistry};

use crate::error::{CrmError, CrmResult};

/// Default page size for list tools.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Maximum page size for list tools.
pub const MAX_PAGE_SIZE: u64 = 200;

/// Build the registry from every domain module's tool collection.
/// Fails on duplicate names.
pub fn build_registry() -> CrmResult<ToolRegistry> {
    ToolRegistry::from_collections([
        customers::tools(),
        invoices::tools(),
        projects::tools(),
        tasks::tools(),
        leads::tools(),
    ])
}

/// Clamp a requested page size into [1, MAX_PAGE_SIZE].
pub(crate) fn effective_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

pub(crate) fn effective_offset(offset: Option<u64>) -> u64 {
    offset.unwrap_or(0)
}

/// Validate a YYYY-MM-DD date argument and normalize it for binding.
pub(crate) fn parse_date(value: &str) -> CrmResult<String> {
    chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|d| d.to_string())
        .map_err(|_| {
            CrmError::validation(format!("Invalid date '{}'. Expected YYYY-MM-DD", value))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_builds_without_collisions() {
        let registry = build_registry().unwrap();
        assert_eq!(registry.len(), 15);
        assert!(registry.get("list_customers").is_some());
        assert!(registry.get("create_invoice").is_some());
        assert!(registry.get("update_task_status").is_some());
    }

    #[test]
    fn test_effective_limit_clamps() {
        assert_eq!(effective_limit(None), DEFAULT_PAGE_SIZE);
        assert_eq!(effective_limit(Some(0)), 1);
        assert_eq!(effective_limit(Some(10_000)), MAX_PAGE_SIZE);
        assert_eq!(effective_limit(Some(25)), 25);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2026-08-06").unwrap(), "2026-08-06");
        assert!(parse_date("06/08/2026").is_err());
        assert!(parse_date("not a date").is_err());
    }
}
