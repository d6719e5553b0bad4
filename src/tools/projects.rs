//! Project tools.

use crate::db::{ConnectionManager, SelectBuilder, SqlParam};
use crate::error::{CrmError, CrmResult};
use crate::tools::registry::Tool;
use crate::tools::{effective_limit, effective_offset};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListProjectsInput {
    /// Restrict to one customer
    #[serde(default)]
    pub customer_id: Option<u64>,
    /// Project status, e.g. "active" or "archived"
    #[serde(default)]
    pub status: Option<String>,
    /// Substring match against the project name
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
pub struct GetProjectInput {
    /// Project id
    pub id: u64,
}

async fn list_projects(
    input: ListProjectsInput,
    db: Arc<ConnectionManager>,
) -> CrmResult<JsonValue> {
    let builder = SelectBuilder::new("projects")
        .filter_opt("customer_id = ?", input.customer_id)
        .filter_opt("status = ?", input.status)
        .like_opt("name", input.search.as_deref())
        .order_by("created_at DESC")
        .limit(effective_limit(input.limit))
        .offset(effective_offset(input.offset));

    let (sql, params) = builder.build();
    let projects = db.query(&sql, &params).await?;

    let (count_sql, count_params) = builder.build_count();
    let total = db.record_count(&count_sql, &count_params).await?;

    info!(count = projects.len(), total = total, "Listed projects");
    Ok(json!({
        "projects": projects,
        "count": projects.len(),
        "total": total,
    }))
}

async fn get_project(input: GetProjectInput, db: Arc<ConnectionManager>) -> CrmResult<JsonValue> {
    let project = db
        .query_one(
            "SELECT * FROM projects WHERE id = ?",
            &[SqlParam::from(input.id)],
        )
        .await?
        .ok_or_else(|| CrmError::not_found("Project", input.id))?;

    let open_tasks = db
        .record_count(
            "SELECT COUNT(*) AS total FROM tasks WHERE project_id = ? AND status <> 'done'",
            &[SqlParam::from(input.id)],
        )
        .await?;

    Ok(json!({ "project": project, "open_tasks": open_tasks }))
}

/// Project tool collection.
pub fn tools() -> Vec<Tool> {
    vec![
        Tool::typed::<ListProjectsInput, _, _>(
            "list_projects",
            "List projects.\nSupports filtering by customer, status, and name substring, with limit/offset paging.",
            list_projects,
        ),
        Tool::typed::<GetProjectInput, _, _>(
            "get_project",
            "Fetch a project by id, including its open task count.",
            get_project,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names() {
        let names: Vec<&str> = tools().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["list_projects", "get_project"]);
    }

    #[test]
    fn test_get_input_requires_id() {
        let result: Result<GetProjectInput, _> = serde_json::from_str("{}");
        assert!(result.is_err());
    }
}
