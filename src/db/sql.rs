//! SELECT statement builder for the domain tools.
//!
//! The builder accumulates an ordered predicate list and keeps the
//! placeholder/parameter alignment mechanical: every `filter` call pushes
//! one `?` expression and the matching parameter together. The count query
//! is derived from the same predicate list, never by textual substitution
//! into the SELECT template.

use crate::db::params::SqlParam;

#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: String,
    columns: String,
    predicates: Vec<String>,
    params: Vec<SqlParam>,
    order_by: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            predicates: Vec::new(),
            params: Vec::new(),
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    /// Set the projection (defaults to `*`).
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Add a predicate with exactly one `?` placeholder and its parameter.
    pub fn filter(mut self, expr: impl Into<String>, param: impl Into<SqlParam>) -> Self {
        self.predicates.push(expr.into());
        self.params.push(param.into());
        self
    }

    /// Add a predicate with several `?` placeholders and the matching
    /// parameters, in order.
    pub fn filter_with(
        mut self,
        expr: impl Into<String>,
        params: impl IntoIterator<Item = SqlParam>,
    ) -> Self {
        self.predicates.push(expr.into());
        self.params.extend(params);
        self
    }

    /// Add a predicate only when the parameter is present.
    pub fn filter_opt<P: Into<SqlParam>>(
        self,
        expr: impl Into<String>,
        param: Option<P>,
    ) -> Self {
        match param {
            Some(p) => self.filter(expr, p),
            None => self,
        }
    }

    /// Add a `column LIKE ?` predicate wrapping the term in wildcards.
    /// Skipped for empty terms.
    pub fn like_opt(self, column: &str, term: Option<&str>) -> Self {
        match term {
            Some(t) if !t.trim().is_empty() => self.filter(
                format!("{} LIKE ?", column),
                format!("%{}%", t.trim()),
            ),
            _ => self,
        }
    }

    /// Add a predicate without parameters (e.g. `deleted = 0`).
    pub fn raw_filter(mut self, expr: impl Into<String>) -> Self {
        self.predicates.push(expr.into());
        self
    }

    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by = Some(clause.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Render the SELECT statement and its aligned parameter list.
    pub fn build(&self) -> (String, Vec<SqlParam>) {
        let mut sql = format!("SELECT {} FROM {}", self.columns, self.table);
        let mut params = self.params.clone();

        if !self.predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.predicates.join(" AND "));
        }
        if let Some(order) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(SqlParam::Int(limit as i64));
            if let Some(offset) = self.offset {
                sql.push_str(" OFFSET ?");
                params.push(SqlParam::Int(offset as i64));
            }
        }

        (sql, params)
    }

    /// Render the matching `SELECT COUNT(*)` statement from the same
    /// predicate list. Ordering and paging do not apply to counts.
    pub fn build_count(&self) -> (String, Vec<SqlParam>) {
        let mut sql = format!("SELECT COUNT(*) AS total FROM {}", self.table);
        if !self.predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.predicates.join(" AND "));
        }
        (sql, self.params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_select() {
        let (sql, params) = SelectBuilder::new("customers").build();
        assert_eq!(sql, "SELECT * FROM customers");
        assert!(params.is_empty());
    }

    #[test]
    fn test_predicates_and_params_stay_aligned() {
        let (sql, params) = SelectBuilder::new("invoices")
            .filter("customer_id = ?", 7i64)
            .filter("status = ?", "open")
            .build();
        assert_eq!(
            sql,
            "SELECT * FROM invoices WHERE customer_id = ? AND status = ?"
        );
        assert_eq!(params.len(), 2);
        assert!(matches!(params[0], SqlParam::Int(7)));
        assert!(matches!(params[1], SqlParam::String(ref s) if s == "open"));
    }

    #[test]
    fn test_optional_filters_skip_absent_values() {
        let (sql, params) = SelectBuilder::new("tasks")
            .filter_opt("project_id = ?", None::<i64>)
            .filter_opt("status = ?", Some("done"))
            .build();
        assert_eq!(sql, "SELECT * FROM tasks WHERE status = ?");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_like_wraps_term_in_wildcards() {
        let (sql, params) = SelectBuilder::new("customers")
            .like_opt("name", Some("corp"))
            .build();
        assert_eq!(sql, "SELECT * FROM customers WHERE name LIKE ?");
        assert!(matches!(params[0], SqlParam::String(ref s) if s == "%corp%"));
    }

    #[test]
    fn test_filter_with_keeps_multi_placeholder_groups_aligned() {
        let (sql, params) = SelectBuilder::new("leads")
            .filter_with(
                "(name LIKE ? OR company LIKE ?)",
                [SqlParam::from("%x%"), SqlParam::from("%x%")],
            )
            .filter("status = ?", "new")
            .build();
        assert_eq!(
            sql,
            "SELECT * FROM leads WHERE (name LIKE ? OR company LIKE ?) AND status = ?"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_like_skips_blank_terms() {
        let (sql, _) = SelectBuilder::new("customers")
            .like_opt("name", Some("   "))
            .build();
        assert_eq!(sql, "SELECT * FROM customers");
    }

    #[test]
    fn test_limit_offset_append_placeholders_in_order() {
        let (sql, params) = SelectBuilder::new("leads")
            .filter("status = ?", "new")
            .order_by("created_at DESC")
            .limit(25)
            .offset(50)
            .build();
        assert_eq!(
            sql,
            "SELECT * FROM leads WHERE status = ? ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(params.len(), 3);
        assert!(matches!(params[1], SqlParam::Int(25)));
        assert!(matches!(params[2], SqlParam::Int(50)));
    }

    #[test]
    fn test_count_derives_from_predicates_not_template() {
        let builder = SelectBuilder::new("invoices")
            .columns("id, total, (SELECT COUNT(*) FROM invoice_items i WHERE i.invoice_id = invoices.id) AS item_count")
            .filter("status = ?", "open")
            .order_by("issued_at DESC")
            .limit(10);
        let (count_sql, count_params) = builder.build_count();
        // Subqueries in the projection must not leak into the count query.
        assert_eq!(
            count_sql,
            "SELECT COUNT(*) AS total FROM invoices WHERE status = ?"
        );
        assert_eq!(count_params.len(), 1);
    }
}
