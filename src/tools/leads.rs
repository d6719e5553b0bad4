//! Lead tools.

use crate::db::{ConnectionManager, SelectBuilder, SqlParam};
use crate::error::{CrmError, CrmResult};
use crate::tools::customers::opt_param;
use crate::tools::registry::Tool;
use crate::tools::{effective_limit, effective_offset};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::info;

const LEAD_STATUSES: &[&str] = &["new", "contacted", "qualified", "converted", "lost"];

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListLeadsInput {
    /// Lead status: new, contacted, qualified, converted, or lost
    #[serde(default)]
    pub status: Option<String>,
    /// Acquisition source, e.g. "webform" or "referral"
    #[serde(default)]
    pub source: Option<String>,
    /// Owning sales user
    #[serde(default)]
    pub owner: Option<String>,
    /// Substring match against name or company
    #[serde(default)]
    pub search: Option<String>,
    /// Maximum rows to return. Default: 50, max: 200
    #[serde(default)]
    pub limit: Option<u64>,
    /// Rows to skip for paging
    #[serde(default)]
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetLeadInput {
    /// Lead id
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateLeadInput {
    /// Contact name (required, non-empty)
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Acquisition source. Default: "manual"
    #[serde(default)]
    pub source: Option<String>,
}

fn validate_status(status: &str) -> CrmResult<()> {
    if LEAD_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CrmError::validation(format!(
            "Invalid lead status '{}'. Expected one of: {}",
            status,
            LEAD_STATUSES.join(", ")
        )))
    }
}

async fn list_leads(input: ListLeadsInput, db: Arc<ConnectionManager>) -> CrmResult<JsonValue> {
    if let Some(status) = input.status.as_deref() {
        validate_status(status)?;
    }

    let mut builder = SelectBuilder::new("leads")
        .filter_opt("status = ?", input.status)
        .filter_opt("source = ?", input.source)
        .filter_opt("owner = ?", input.owner)
        .order_by("created_at DESC")
        .limit(effective_limit(input.limit))
        .offset(effective_offset(input.offset));

    if let Some(term) = input.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", term);
        builder = builder.filter_with(
            "(name LIKE ? OR company LIKE ?)",
            [SqlParam::from(pattern.clone()), SqlParam::from(pattern)],
        );
    }

    let (sql, params) = builder.build();
    let leads = db.query(&sql, &params).await?;

    let (count_sql, count_params) = builder.build_count();
    let total = db.record_count(&count_sql, &count_params).await?;

    info!(count = leads.len(), total = total, "Listed leads");
    Ok(json!({
        "leads": leads,
        "count": leads.len(),
        "total": total,
    }))
}

async fn get_lead(input: GetLeadInput, db: Arc<ConnectionManager>) -> CrmResult<JsonValue> {
    let lead = db
        .query_one("SELECT * FROM leads WHERE id = ?", &[SqlParam::from(input.id)])
        .await?
        .ok_or_else(|| CrmError::not_found("Lead", input.id))?;

    Ok(json!({ "lead": lead }))
}

async fn create_lead(input: CreateLeadInput, db: Arc<ConnectionManager>) -> CrmResult<JsonValue> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(CrmError::validation("Lead name must not be empty"));
    }
    let source = input.source.unwrap_or_else(|| "manual".to_string());

    let id = db
        .execute_insert(
            "INSERT INTO leads (name, company, email, phone, source, status, created_at) \
             VALUES (?, ?, ?, ?, ?, 'new', NOW())",
            &[
                SqlParam::from(name),
                opt_param(input.company),
                opt_param(input.email),
                opt_param(input.phone),
                SqlParam::from(source),
            ],
        )
        .await?;

    info!(lead_id = id, "Created lead");
    Ok(json!({ "id": id, "status": "new" }))
}

/// Lead tool collection.
pub fn tools() -> Vec<Tool> {
    vec![
        Tool::typed::<ListLeadsInput, _, _>(
            "list_leads",
            "List sales leads.\nSupports filtering by status, source, owner, and name/company substring, with limit/offset paging.",
            list_leads,
        ),
        Tool::typed::<GetLeadInput, _, _>("get_lead", "Fetch a lead by id.", get_lead),
        Tool::typed::<CreateLeadInput, _, _>(
            "create_lead",
            "Create a lead.\nNew leads start in status 'new'.",
            create_lead,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_validation() {
        assert!(validate_status("qualified").is_ok());
        assert!(validate_status("warm").is_err());
    }

    #[test]
    fn test_tool_names() {
        let names: Vec<&str> = tools().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["list_leads", "get_lead", "create_lead"]);
    }
}
