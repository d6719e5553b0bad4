//! Result sanitization.
//!
//! Rows read back from the CRM database pass through the sanitizer before
//! they leave the data-access boundary: any field whose name matches a
//! sensitive term is replaced with a fixed redaction marker. Sanitization
//! never touches caller-supplied parameters and never applies to the write
//! path - only to data read back.

use crate::db::row::Record;
use serde_json::Value as JsonValue;

/// Fixed marker substituted for sensitive values.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Default sensitive-term list, matched case-insensitively as substrings of
/// the field name.
const DEFAULT_SENSITIVE_TERMS: &[&str] = &[
    "password", "passwd", "token", "secret", "key", "card", "ssn",
];

#[derive(Debug, Clone)]
pub struct ResultSanitizer {
    terms: Vec<String>,
}

impl ResultSanitizer {
    /// Create a sanitizer with the default sensitive-term list.
    pub fn new() -> Self {
        Self::with_terms(DEFAULT_SENSITIVE_TERMS.iter().map(|s| s.to_string()))
    }

    /// Create a sanitizer with a custom term list.
    pub fn with_terms(terms: impl IntoIterator<Item = String>) -> Self {
        Self {
            terms: terms.into_iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// Check whether a field name matches a sensitive term.
    pub fn is_sensitive(&self, field: &str) -> bool {
        let lower = field.to_lowercase();
        self.terms.iter().any(|t| lower.contains(t.as_str()))
    }

    /// Redact sensitive fields in a single record, one level deep.
    pub fn sanitize_record(&self, record: &mut Record) {
        for (field, value) in record.iter_mut() {
            if self.is_sensitive(field) && !value.is_null() {
                *value = JsonValue::String(REDACTION_MARKER.to_string());
            }
        }
    }

    /// Redact sensitive fields in every record of a result set.
    pub fn sanitize_records(&self, records: &mut [Record]) {
        for record in records.iter_mut() {
            self.sanitize_record(record);
        }
    }
}

impl Default for ResultSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, JsonValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_redacts_password_and_token() {
        let sanitizer = ResultSanitizer::new();
        let mut row = record(&[
            ("id", json!(1)),
            ("company", json!("Initech")),
            ("password", json!("hunter2")),
            ("api_token", json!("tok_abc123")),
        ]);

        sanitizer.sanitize_record(&mut row);

        assert_eq!(row["id"], json!(1));
        assert_eq!(row["company"], json!("Initech"));
        assert_eq!(row["password"], json!(REDACTION_MARKER));
        assert_eq!(row["api_token"], json!(REDACTION_MARKER));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let sanitizer = ResultSanitizer::new();
        let mut row = record(&[("ApiToken", json!("x")), ("SECRET_KEY", json!("y"))]);
        sanitizer.sanitize_record(&mut row);
        assert_eq!(row["ApiToken"], json!(REDACTION_MARKER));
        assert_eq!(row["SECRET_KEY"], json!(REDACTION_MARKER));
    }

    #[test]
    fn test_null_values_stay_null() {
        let sanitizer = ResultSanitizer::new();
        let mut row = record(&[("password", JsonValue::Null)]);
        sanitizer.sanitize_record(&mut row);
        assert!(row["password"].is_null());
    }

    #[test]
    fn test_sanitize_records_covers_every_row() {
        let sanitizer = ResultSanitizer::new();
        let mut rows = vec![
            record(&[("card_number", json!("4111111111111111"))]),
            record(&[("card_number", json!("5500000000000004"))]),
        ];
        sanitizer.sanitize_records(&mut rows);
        for row in &rows {
            assert_eq!(row["card_number"], json!(REDACTION_MARKER));
        }
    }

    #[test]
    fn test_custom_terms() {
        let sanitizer = ResultSanitizer::with_terms(["iban".to_string()]);
        assert!(sanitizer.is_sensitive("customer_iban"));
        assert!(!sanitizer.is_sensitive("password"));
    }
}
