//! Shape checks for inbound payloads.
//!
//! A payload is checked field by field against a declared [`Schema`]: required
//! fields must be present and every present field must have the declared
//! primitive kind. All violations are reported together. Only declared fields
//! survive into the typed command; anything else in the body is dropped.
//!
//! Domain rules (month range, known categories, sign of amounts) are not
//! checked here.

use std::collections::BTreeMap;

use fintrack_core::{NewExpense, NewSalary, SalaryPatch};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A JSON number without a fractional part that fits in `i64`.
    Integer,
    Text,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Text => "string",
        }
    }

    fn coerce(&self, value: &Value) -> Option<FieldValue> {
        match self {
            FieldKind::Integer => as_integer(value).map(FieldValue::Integer),
            FieldKind::Text => value.as_str().map(|s| FieldValue::Text(s.to_string())),
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(n) if n.as_i64().is_none() => "out-of-range integer",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl Field {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Field { name, kind, required: true }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Field { name, kind, required: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Integer(i64),
    Text(String),
}

/// The declared fields of a payload that passed the shape check.
#[derive(Debug, Default)]
pub struct Fields {
    values: BTreeMap<&'static str, FieldValue>,
}

impl Fields {
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(FieldValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn required_integer(&self, name: &'static str) -> Result<i64, ValidationError> {
        self.integer(name)
            .ok_or_else(|| ValidationError::from(Issue::required(name, FieldKind::Integer)))
    }

    pub fn required_text(&self, name: &'static str) -> Result<String, ValidationError> {
        self.text(name)
            .map(str::to_string)
            .ok_or_else(|| ValidationError::from(Issue::required(name, FieldKind::Text)))
    }
}

/// A payload shape that can be checked and then built from its fields.
pub trait Schema: Sized {
    const FIELDS: &'static [Field];

    fn from_fields(fields: &Fields) -> Result<Self, ValidationError>;
}

impl Schema for NewSalary {
    const FIELDS: &'static [Field] = &[
        Field::required("amount", FieldKind::Integer),
        Field::required("month", FieldKind::Integer),
        Field::required("year", FieldKind::Integer),
    ];

    fn from_fields(fields: &Fields) -> Result<Self, ValidationError> {
        Ok(NewSalary {
            amount: fields.required_integer("amount")?,
            month: fields.required_integer("month")?,
            year: fields.required_integer("year")?,
        })
    }
}

impl Schema for SalaryPatch {
    const FIELDS: &'static [Field] = &[
        Field::optional("amount", FieldKind::Integer),
        Field::optional("month", FieldKind::Integer),
        Field::optional("year", FieldKind::Integer),
    ];

    fn from_fields(fields: &Fields) -> Result<Self, ValidationError> {
        Ok(SalaryPatch {
            amount: fields.integer("amount"),
            month: fields.integer("month"),
            year: fields.integer("year"),
        })
    }
}

impl Schema for NewExpense {
    const FIELDS: &'static [Field] = &[
        Field::required("amount", FieldKind::Integer),
        Field::required("category", FieldKind::Text),
        Field::required("month", FieldKind::Integer),
        Field::required("year", FieldKind::Integer),
    ];

    fn from_fields(fields: &Fields) -> Result<Self, ValidationError> {
        Ok(NewExpense {
            amount: fields.required_integer("amount")?,
            category: fields.required_text("category")?,
            month: fields.required_integer("month")?,
            year: fields.required_integer("year")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    InvalidType,
    Required,
    InvalidJson,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub code: IssueCode,
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<&'static str>,
    pub message: String,
}

impl Issue {
    pub fn required(field: &str, kind: FieldKind) -> Self {
        Issue {
            code: IssueCode::Required,
            path: vec![field.to_string()],
            expected: Some(kind.name()),
            received: Some("undefined"),
            message: "Required".to_string(),
        }
    }

    pub fn invalid_type(path: Vec<String>, expected: &'static str, received: &'static str) -> Self {
        Issue {
            code: IssueCode::InvalidType,
            path,
            expected: Some(expected),
            received: Some(received),
            message: format!("Expected {}, received {}", expected, received),
        }
    }

    pub fn invalid_json(message: String) -> Self {
        Issue {
            code: IssueCode::InvalidJson,
            path: Vec::new(),
            expected: None,
            received: None,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid payload: {}", format_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

impl From<Issue> for ValidationError {
    fn from(issue: Issue) -> Self {
        ValidationError { issues: vec![issue] }
    }
}

fn format_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| {
            if issue.path.is_empty() {
                issue.message.clone()
            } else {
                format!("{}: {}", issue.path.join("."), issue.message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Checks `body` against `T`'s declared fields and builds `T` from them.
pub fn validate<T: Schema>(body: &Value) -> Result<T, ValidationError> {
    let object = match body {
        Value::Object(object) => object,
        other => return Err(Issue::invalid_type(Vec::new(), "object", describe(other)).into()),
    };

    let mut issues = Vec::new();
    let mut fields = Fields::default();

    for field in T::FIELDS {
        match object.get(field.name) {
            None | Some(Value::Null) if !field.required => {}
            None => issues.push(Issue::required(field.name, field.kind)),
            Some(value) => match field.kind.coerce(value) {
                Some(v) => {
                    fields.values.insert(field.name, v);
                }
                None => issues.push(Issue::invalid_type(
                    vec![field.name.to_string()],
                    field.kind.name(),
                    describe(value),
                )),
            },
        }
    }

    if !issues.is_empty() {
        return Err(ValidationError { issues });
    }
    T::from_fields(&fields)
}

/// Parses a raw request body. An empty body is treated as `null`.
pub fn parse_body(bytes: &[u8]) -> Result<Value, ValidationError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
        .map_err(|e| Issue::invalid_json(format!("Malformed JSON: {}", e)).into())
}

/// Parses an integer taken from the path or query string.
pub fn parse_param(name: &str, raw: &str) -> Result<i64, ValidationError> {
    raw.trim().parse().map_err(|_| {
        ValidationError::from(Issue {
            code: IssueCode::InvalidType,
            path: vec![name.to_string()],
            expected: Some(FieldKind::Integer.name()),
            received: Some("string"),
            message: format!("Expected integer {}, received {:?}", name, raw),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(err: &ValidationError) -> Vec<String> {
        err.issues.iter().map(|i| i.path.join(".")).collect()
    }

    #[test]
    fn valid_salary() {
        let salary: NewSalary = validate(&json!({"amount": 5000, "month": 1, "year": 2025})).unwrap();
        assert_eq!(salary, NewSalary { amount: 5000, month: 1, year: 2025 });
    }

    #[test]
    fn every_violation_is_reported() {
        let err = validate::<NewExpense>(&json!({"amount": "5000", "year": 2025})).unwrap_err();
        assert_eq!(paths(&err), vec!["amount", "category", "month"]);
        assert_eq!(err.issues[0].code, IssueCode::InvalidType);
        assert_eq!(err.issues[0].received, Some("string"));
        assert_eq!(err.issues[1].code, IssueCode::Required);
        assert_eq!(err.issues[2].code, IssueCode::Required);
    }

    #[test]
    fn extra_fields_are_stripped() {
        let expense: NewExpense = validate(&json!({
            "id": 99,
            "createdAt": "2020-01-01T00:00:00Z",
            "amount": 1200,
            "category": "Rent",
            "month": 1,
            "year": 2025,
            "note": "march"
        }))
        .unwrap();
        assert_eq!(expense, NewExpense { amount: 1200, category: "Rent".to_string(), month: 1, year: 2025 });
    }

    #[test]
    fn domain_constraints_are_not_checked() {
        let expense: NewExpense = validate(&json!({"amount": -5, "category": "Gym", "month": 14, "year": 0})).unwrap();
        assert_eq!(expense.amount, -5);
        assert_eq!(expense.category, "Gym");
        assert_eq!(expense.month, 14);
    }

    #[test]
    fn integral_floats_are_integers() {
        let salary: NewSalary = validate(&json!({"amount": 5000.0, "month": 1, "year": 2025})).unwrap();
        assert_eq!(salary.amount, 5000);

        let err = validate::<NewSalary>(&json!({"amount": 12.5, "month": 1, "year": 2025})).unwrap_err();
        assert_eq!(err.issues[0].received, Some("float"));
        assert_eq!(err.issues[0].message, "Expected integer, received float");
    }

    #[test]
    fn integers_beyond_i64_are_out_of_range() {
        let err = validate::<NewSalary>(&json!({"amount": 10000000000000000000u64, "month": 1, "year": 2025})).unwrap_err();
        assert_eq!(paths(&err), vec!["amount"]);
        assert_eq!(err.issues[0].received, Some("out-of-range integer"));
        assert_eq!(err.issues[0].message, "Expected integer, received out-of-range integer");
    }

    #[test]
    fn null_is_absent_only_when_optional() {
        let patch: SalaryPatch = validate(&json!({"amount": 6000, "month": null})).unwrap();
        assert_eq!(patch, SalaryPatch { amount: Some(6000), month: None, year: None });

        let err = validate::<NewSalary>(&json!({"amount": null, "month": 1, "year": 2025})).unwrap_err();
        assert_eq!(err.issues[0].code, IssueCode::InvalidType);
        assert_eq!(err.issues[0].received, Some("null"));
    }

    #[test]
    fn empty_patch_is_valid() {
        let patch: SalaryPatch = validate(&json!({})).unwrap();
        assert_eq!(patch, SalaryPatch::default());

        let err = validate::<SalaryPatch>(&json!({"year": "2025"})).unwrap_err();
        assert_eq!(paths(&err), vec!["year"]);
    }

    #[test]
    fn non_object_body() {
        let err = validate::<NewSalary>(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert!(err.issues[0].path.is_empty());
        assert_eq!(err.issues[0].received, Some("array"));

        let err = validate::<NewSalary>(&Value::Null).unwrap_err();
        assert_eq!(err.issues[0].received, Some("null"));
    }

    #[test]
    fn malformed_json_and_ids() {
        assert_eq!(parse_body(b"  ").unwrap(), Value::Null);
        let err = parse_body(b"{\"amount\": ").unwrap_err();
        assert_eq!(err.issues[0].code, IssueCode::InvalidJson);

        assert_eq!(parse_param("id", "17").unwrap(), 17);
        assert_eq!(paths(&parse_param("id", "abc").unwrap_err()), vec!["id"]);
        assert_eq!(parse_param("year", "2025.5").unwrap_err().issues[0].message, "Expected integer year, received \"2025.5\"");
    }

    #[test]
    fn display_lists_issues() {
        let err = validate::<NewSalary>(&json!({"amount": true})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid payload: amount: Expected integer, received boolean; month: Required; year: Required"
        );
    }
}
