//! Invoice tools.
//!
//! `create_invoice` writes the invoice header and its line items in one
//! transaction; a failure anywhere rolls the whole document back.

use crate::db::{ConnectionManager, SelectBuilder, SqlParam};
use crate::error::{CrmError, CrmResult};
use crate::tools::registry::Tool;
use crate::tools::{effective_limit, effective_offset, parse_date};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::info;

const INVOICE_STATUSES: &[&str] = &["draft", "open", "paid", "overdue", "cancelled"];

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListInvoicesInput {
    /// Restrict to one customer
    #[serde(default)]
    pub customer_id: Option<u64>,
    /// Invoice status: draft, open, paid, overdue, or cancelled
    #[serde(default)]
    pub status: Option<String>,
    /// Only invoices issued on or after this date (YYYY-MM-DD)
    #[serde(default)]
    pub issued_after: Option<String>,
    /// Only invoices issued on or before this date (YYYY-MM-DD)
    #[serde(default)]
    pub issued_before: Option<String>,
    /// Minimum invoice total
    #[serde(default)]
    pub min_total: Option<f64>,
    /// Maximum invoice total
    #[serde(default)]
    pub max_total: Option<f64>,
    /// Maximum rows to return. Default: 50, max: 200
    #[serde(default)]
    pub limit: Option<u64>,
    /// Rows to skip for paging
    #[serde(default)]
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetInvoiceInput {
    /// Invoice id
    pub id: u64,
}

/// One line item of a new invoice.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct InvoiceItemInput {
    pub description: String,
    /// Quantity, must be positive
    pub quantity: i64,
    /// Unit price, must not be negative
    pub unit_price: f64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateInvoiceInput {
    /// Customer the invoice is billed to
    pub customer_id: u64,
    /// Line items; at least one is required
    pub items: Vec<InvoiceItemInput>,
    /// Initial status. Default: draft
    #[serde(default)]
    pub status: Option<String>,
    /// Issue date (YYYY-MM-DD). Default: today
    #[serde(default)]
    pub issued_on: Option<String>,
}

fn validate_status(status: &str) -> CrmResult<()> {
    if INVOICE_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CrmError::validation(format!(
            "Invalid invoice status '{}'. Expected one of: {}",
            status,
            INVOICE_STATUSES.join(", ")
        )))
    }
}

async fn list_invoices(
    input: ListInvoicesInput,
    db: Arc<ConnectionManager>,
) -> CrmResult<JsonValue> {
    if let Some(status) = input.status.as_deref() {
        validate_status(status)?;
    }
    let issued_after = input.issued_after.as_deref().map(parse_date).transpose()?;
    let issued_before = input.issued_before.as_deref().map(parse_date).transpose()?;

    let builder = SelectBuilder::new("invoices")
        .filter_opt("customer_id = ?", input.customer_id)
        .filter_opt("status = ?", input.status)
        .filter_opt("issued_on >= ?", issued_after)
        .filter_opt("issued_on <= ?", issued_before)
        .filter_opt("total >= ?", input.min_total)
        .filter_opt("total <= ?", input.max_total)
        .order_by("issued_on DESC, id DESC")
        .limit(effective_limit(input.limit))
        .offset(effective_offset(input.offset));

    let (sql, params) = builder.build();
    let invoices = db.query(&sql, &params).await?;

    let (count_sql, count_params) = builder.build_count();
    let total = db.record_count(&count_sql, &count_params).await?;

    info!(count = invoices.len(), total = total, "Listed invoices");
    Ok(json!({
        "invoices": invoices,
        "count": invoices.len(),
        "total": total,
    }))
}

async fn get_invoice(input: GetInvoiceInput, db: Arc<ConnectionManager>) -> CrmResult<JsonValue> {
    let invoice = db
        .query_one(
            "SELECT * FROM invoices WHERE id = ?",
            &[SqlParam::from(input.id)],
        )
        .await?
        .ok_or_else(|| CrmError::not_found("Invoice", input.id))?;

    let items = db
        .query(
            "SELECT * FROM invoice_items WHERE invoice_id = ? ORDER BY id ASC",
            &[SqlParam::from(input.id)],
        )
        .await?;

    Ok(json!({ "invoice": invoice, "items": items }))
}

async fn create_invoice(
    input: CreateInvoiceInput,
    db: Arc<ConnectionManager>,
) -> CrmResult<JsonValue> {
    if input.items.is_empty() {
        return Err(CrmError::validation(
            "An invoice needs at least one line item",
        ));
    }
    for item in &input.items {
        if item.description.trim().is_empty() {
            return Err(CrmError::validation("Line item description must not be empty"));
        }
        if item.quantity <= 0 {
            return Err(CrmError::validation("Line item quantity must be positive"));
        }
        if item.unit_price < 0.0 {
            return Err(CrmError::validation("Line item unit price must not be negative"));
        }
    }
    let status = input.status.unwrap_or_else(|| "draft".to_string());
    validate_status(&status)?;
    let issued_on = input
        .issued_on
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| chrono::Utc::now().date_naive().to_string());

    let total: f64 = input
        .items
        .iter()
        .map(|i| i.quantity as f64 * i.unit_price)
        .sum();

    let mgr = db.clone();
    let customer_id = input.customer_id;
    let items = input.items;
    let invoice_id = db
        .transaction(move |tx| {
            Box::pin(async move {
                // The customer must exist; FK-less legacy schema, so check here.
                let customer = mgr
                    .query_in_tx(
                        tx,
                        "SELECT id FROM customers WHERE id = ?",
                        &[SqlParam::from(customer_id)],
                    )
                    .await?;
                if customer.is_empty() {
                    return Err(CrmError::not_found("Customer", customer_id));
                }

                let invoice_id = mgr
                    .insert_in_tx(
                        tx,
                        "INSERT INTO invoices (customer_id, status, total, issued_on, created_at) \
                         VALUES (?, ?, ?, ?, NOW())",
                        &[
                            SqlParam::from(customer_id),
                            SqlParam::from(status),
                            SqlParam::Float(total),
                            SqlParam::from(issued_on),
                        ],
                    )
                    .await?;

                for item in &items {
                    mgr.insert_in_tx(
                        tx,
                        "INSERT INTO invoice_items (invoice_id, description, quantity, unit_price) \
                         VALUES (?, ?, ?, ?)",
                        &[
                            SqlParam::from(invoice_id),
                            SqlParam::from(item.description.trim()),
                            SqlParam::Int(item.quantity),
                            SqlParam::Float(item.unit_price),
                        ],
                    )
                    .await?;
                }

                Ok(invoice_id)
            })
        })
        .await?;

    info!(invoice_id = invoice_id, total = total, "Created invoice");
    Ok(json!({ "id": invoice_id, "total": total }))
}

/// Invoice tool collection.
pub fn tools() -> Vec<Tool> {
    vec![
        Tool::typed::<ListInvoicesInput, _, _>(
            "list_invoices",
            "List invoices.\nSupports filtering by customer, status, issue-date range, and total range, with limit/offset paging.",
            list_invoices,
        ),
        Tool::typed::<GetInvoiceInput, _, _>(
            "get_invoice",
            "Fetch an invoice and its line items by id.",
            get_invoice,
        ),
        Tool::typed::<CreateInvoiceInput, _, _>(
            "create_invoice",
            "Create an invoice with its line items in one transaction.\nThe total is computed from the items. Rolls back entirely on any failure.",
            create_invoice,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_validation() {
        assert!(validate_status("open").is_ok());
        assert!(validate_status("bogus").is_err());
    }

    #[test]
    fn test_list_input_with_filters() {
        let input: ListInvoicesInput = serde_json::from_str(
            r#"{"customer_id": 3, "status": "open", "min_total": 100.0}"#,
        )
        .unwrap();
        assert_eq!(input.customer_id, Some(3));
        assert_eq!(input.status.as_deref(), Some("open"));
    }

    #[test]
    fn test_create_input_requires_items_field() {
        let result: Result<CreateInvoiceInput, _> =
            serde_json::from_str(r#"{"customer_id": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_tool_names() {
        let names: Vec<&str> = tools().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["list_invoices", "get_invoice", "create_invoice"]);
    }
}
