//! Task tools.

use crate::db::{ConnectionManager, SelectBuilder, SqlParam};
use crate::error::{CrmError, CrmResult};
use crate::tools::customers::opt_param;
use crate::tools::registry::Tool;
use crate::tools::{effective_limit, effective_offset, parse_date};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::info;

const TASK_STATUSES: &[&str] = &["open", "in_progress", "blocked", "done", "cancelled"];

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTasksInput {
    /// Restrict to one project
    #[serde(default)]
    pub project_id: Option<u64>,
    /// Assignee username
    #[serde(default)]
    pub assignee: Option<String>,
    /// Task status: open, in_progress, blocked, done, or cancelled
    #[serde(default)]
    pub status: Option<String>,
    /// Only tasks due on or before this date (YYYY-MM-DD)
    #[serde(default)]
    pub due_before: Option<String>,
    /// Maximum rows to return. Default: 50, max: 200
    #[serde(default)]
    pub limit: Option<u64>,
    /// Rows to skip for paging
    #[serde(default)]
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTaskInput {
    /// Task id
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateTaskInput {
    /// Project the task belongs to
    pub project_id: u64,
    /// Task title (required, non-empty)
    pub title: String,
    #[serde(default)]
    pub assignee: Option<String>,
    /// Due date (YYYY-MM-DD)
    #[serde(default)]
    pub due_on: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateTaskStatusInput {
    /// Task id
    pub id: u64,
    /// New status: open, in_progress, blocked, done, or cancelled
    pub status: String,
}

fn validate_status(status: &str) -> CrmResult<()> {
    if TASK_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(CrmError::validation(format!(
            "Invalid task status '{}'. Expected one of: {}",
            status,
            TASK_STATUSES.join(", ")
        )))
    }
}

async fn list_tasks(input: ListTasksInput, db: Arc<ConnectionManager>) -> CrmResult<JsonValue> {
    if let Some(status) = input.status.as_deref() {
        validate_status(status)?;
    }
    let due_before = input.due_before.as_deref().map(parse_date).transpose()?;

    let builder = SelectBuilder::new("tasks")
        .filter_opt("project_id = ?", input.project_id)
        .filter_opt("assignee = ?", input.assignee)
        .filter_opt("status = ?", input.status)
        .filter_opt("due_on <= ?", due_before)
        .order_by("due_on ASC, id ASC")
        .limit(effective_limit(input.limit))
        .offset(effective_offset(input.offset));

    let (sql, params) = builder.build();
    let tasks = db.query(&sql, &params).await?;

    let (count_sql, count_params) = builder.build_count();
    let total = db.record_count(&count_sql, &count_params).await?;

    info!(count = tasks.len(), total = total, "Listed tasks");
    Ok(json!({
        "tasks": tasks,
        "count": tasks.len(),
        "total": total,
    }))
}

async fn get_task(input: GetTaskInput, db: Arc<ConnectionManager>) -> CrmResult<JsonValue> {
    let task = db
        .query_one("SELECT * FROM tasks WHERE id = ?", &[SqlParam::from(input.id)])
        .await?
        .ok_or_else(|| CrmError::not_found("Task", input.id))?;

    Ok(json!({ "task": task }))
}

async fn create_task(input: CreateTaskInput, db: Arc<ConnectionManager>) -> CrmResult<JsonValue> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(CrmError::validation("Task title must not be empty"));
    }
    let due_on = input.due_on.as_deref().map(parse_date).transpose()?;

    let project = db
        .query_one(
            "SELECT id FROM projects WHERE id = ?",
            &[SqlParam::from(input.project_id)],
        )
        .await?;
    if project.is_none() {
        return Err(CrmError::not_found("Project", input.project_id));
    }

    let id = db
        .execute_insert(
            "INSERT INTO tasks (project_id, title, assignee, status, due_on, created_at) \
             VALUES (?, ?, ?, 'open', ?, NOW())",
            &[
                SqlParam::from(input.project_id),
                SqlParam::from(title),
                opt_param(input.assignee),
                opt_param(due_on),
            ],
        )
        .await?;

    info!(task_id = id, project_id = input.project_id, "Created task");
    Ok(json!({ "id": id }))
}

async fn update_task_status(
    input: UpdateTaskStatusInput,
    db: Arc<ConnectionManager>,
) -> CrmResult<JsonValue> {
    validate_status(&input.status)?;

    let affected = db
        .execute(
            "UPDATE tasks SET status = ? WHERE id = ?",
            &[SqlParam::from(input.status.clone()), SqlParam::from(input.id)],
        )
        .await?;

    if affected == 0 {
        return Err(CrmError::not_found("Task", input.id));
    }

    info!(task_id = input.id, status = %input.status, "Updated task status");
    Ok(json!({ "id": input.id, "status": input.status }))
}

/// Task tool collection.
pub fn tools() -> Vec<Tool> {
    vec![
        Tool::typed::<ListTasksInput, _, _>(
            "list_tasks",
            "List tasks.\nSupports filtering by project, assignee, status, and due date, with limit/offset paging.",
            list_tasks,
        ),
        Tool::typed::<GetTaskInput, _, _>("get_task", "Fetch a task by id.", get_task),
        Tool::typed::<CreateTaskInput, _, _>(
            "create_task",
            "Create a task in a project.\nNew tasks start in status 'open'.",
            create_task,
        ),
        Tool::typed::<UpdateTaskStatusInput, _, _>(
            "update_task_status",
            "Move a task to a new status.",
            update_task_status,
        ),
    ]
}
