//! Customer tools.
//!
//! Thin filter builders over the `customers` table: list with optional
//! filters, fetch by id, create.

use crate::db::{ConnectionManager, SelectBuilder, SqlParam};
use crate::error::{CrmError, CrmResult};
use crate::tools::registry::Tool;
use crate::tools::{effective_limit, effective_offset};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::info;

/// Input for the list_customers tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListCustomersInput {
    /// Substring match against the customer name
    #[serde(default)]
    pub search: Option<String>,
    /// Exact email address
    #[serde(default)]
    pub email: Option<String>,
    /// Exact city
    #[serde(default)]
    pub city: Option<String>,
    /// Industry label, e.g. "manufacturing"
    #[serde(default)]
    pub industry: Option<String>,
    /// Maximum rows to return. Default: 50, max: 200
    #[serde(default)]
    pub limit: Option<u64>,
    /// Rows to skip for paging
    #[serde(default)]
    pub offset: Option<u64>,
}

/// Input for the get_customer tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetCustomerInput {
    /// Customer id
    pub id: u64,
}

/// Input for the create_customer tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateCustomerInput {
    /// Customer name (required, non-empty)
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

async fn list_customers(
    input: ListCustomersInput,
    db: Arc<ConnectionManager>,
) -> CrmResult<JsonValue> {
    let builder = SelectBuilder::new("customers")
        .like_opt("name", input.search.as_deref())
        .filter_opt("email = ?", input.email)
        .filter_opt("city = ?", input.city)
        .filter_opt("industry = ?", input.industry)
        .order_by("name ASC")
        .limit(effective_limit(input.limit))
        .offset(effective_offset(input.offset));

    let (sql, params) = builder.build();
    let customers = db.query(&sql, &params).await?;

    let (count_sql, count_params) = builder.build_count();
    let total = db.record_count(&count_sql, &count_params).await?;

    info!(count = customers.len(), total = total, "Listed customers");
    Ok(json!({
        "customers": customers,
        "count": customers.len(),
        "total": total,
    }))
}

async fn get_customer(input: GetCustomerInput, db: Arc<ConnectionManager>) -> CrmResult<JsonValue> {
    let customer = db
        .query_one(
            "SELECT * FROM customers WHERE id = ?",
            &[SqlParam::from(input.id)],
        )
        .await?
        .ok_or_else(|| CrmError::not_found("Customer", input.id))?;

    Ok(json!({ "customer": customer }))
}

async fn create_customer(
    input: CreateCustomerInput,
    db: Arc<ConnectionManager>,
) -> CrmResult<JsonValue> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(CrmError::validation("Customer name must not be empty"));
    }

    let id = db
        .execute_insert(
            "INSERT INTO customers (name, email, phone, city, industry, created_at) \
             VALUES (?, ?, ?, ?, ?, NOW())",
            &[
                SqlParam::from(name),
                opt_param(input.email),
                opt_param(input.phone),
                opt_param(input.city),
                opt_param(input.industry),
            ],
        )
        .await?;

    info!(customer_id = id, "Created customer");
    let customer = db
        .query_one("SELECT * FROM customers WHERE id = ?", &[SqlParam::from(id)])
        .await?;

    Ok(json!({ "id": id, "customer": customer }))
}

pub(crate) fn opt_param(value: Option<String>) -> SqlParam {
    match value {
        Some(v) => SqlParam::String(v),
        None => SqlParam::Null,
    }
}

/// Customer tool collection.
pub fn tools() -> Vec<Tool> {
    vec![
        Tool::typed::<ListCustomersInput, _, _>(
            "list_customers",
            "List CRM customers.\nSupports filtering by name substring, email, city, and industry, with limit/offset paging.",
            list_customers,
        ),
        Tool::typed::<GetCustomerInput, _, _>(
            "get_customer",
            "Fetch a single customer by id.",
            get_customer,
        ),
        Tool::typed::<CreateCustomerInput, _, _>(
            "create_customer",
            "Create a customer record.\nName is required; email, phone, city, and industry are optional.",
            create_customer,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tools_are_exported_once() {
        let names: Vec<&str> = tools().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["list_customers", "get_customer", "create_customer"]);
    }

    #[test]
    fn test_list_input_accepts_empty_bag() {
        let input: ListCustomersInput = serde_json::from_str("{}").unwrap();
        assert!(input.search.is_none());
        assert!(input.limit.is_none());
    }

    #[test]
    fn test_create_input_requires_name() {
        let result: Result<CreateCustomerInput, _> =
            serde_json::from_str(r#"{"email": "a@b.example"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_opt_param_maps_none_to_null() {
        assert!(opt_param(None).is_null());
        assert!(!opt_param(Some("x".into())).is_null());
    }
}
