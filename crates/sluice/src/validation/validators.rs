//! Value predicates and the schema-driven row checker.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::table::{Row, Table, Value};
use crate::validation::result::{RowErrors, ValidationReport, ValidationResult};
use crate::validation::schema::{FieldRule, Schema};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap()
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\s()+\-]{10,}$").unwrap());

/// Whether the value is a well-formed email address. Non-string input is
/// never valid.
pub fn validate_email(value: &Value) -> bool {
    match value.as_str() {
        Some(s) => EMAIL_RE.is_match(s),
        None => false,
    }
}

/// Whether the value looks like a phone number: at least ten characters,
/// all digits, spaces, parentheses, `+` or `-`.
pub fn validate_phone(value: &Value) -> bool {
    match value.as_str() {
        Some(s) => PHONE_RE.is_match(s),
        None => false,
    }
}

/// Whether the value is numeric and inside the inclusive bounds. Int and
/// Float pass directly; strings are parsed as f64; everything else fails.
pub fn validate_numeric(value: &Value, min: Option<f64>, max: Option<f64>) -> bool {
    let number = match value {
        Value::Int(_) | Value::Float(_) => value.as_f64(),
        Value::Str(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) => min.is_none_or(|lo| n >= lo) && max.is_none_or(|hi| n <= hi),
        None => false,
    }
}

/// Whether the string value parses under the chrono `%`-format, tried as
/// datetime, then date, then time. Non-string input is never valid.
pub fn validate_date(value: &Value, format: &str) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    NaiveDateTime::parse_from_str(s, format).is_ok()
        || NaiveDate::parse_from_str(s, format).is_ok()
        || NaiveTime::parse_from_str(s, format).is_ok()
}

/// Whether the string value's character count is inside the inclusive
/// bounds. Non-string input is never valid.
pub fn validate_string_length(value: &Value, min_len: usize, max_len: Option<usize>) -> bool {
    match value.as_str() {
        Some(s) => {
            let len = s.chars().count();
            len >= min_len && max_len.is_none_or(|hi| len <= hi)
        }
        None => false,
    }
}

/// Whether the value appears in the allowed list, by exact equality with
/// no coercion (`Int(3)` does not match `Float(3.0)`).
pub fn validate_in_list(value: &Value, allowed: &[Value]) -> bool {
    allowed.contains(value)
}

/// Check one row against the schema. A declared field absent from the row
/// is a "missing required field" error; otherwise its rules run in the
/// fixed order type, email, numeric, date, accumulating every failure.
pub fn validate_row(row: &Row<'_>, schema: &Schema) -> ValidationResult {
    let mut errors = Vec::new();

    for (field, rules) in &schema.fields {
        let Some(value) = row.get(field) else {
            errors.push(format!("missing required field: {}", field));
            continue;
        };

        let mut ordered: Vec<&FieldRule> = rules.iter().collect();
        ordered.sort_by_key(|rule| rule_rank(rule));

        for rule in ordered {
            match rule {
                FieldRule::Type { expected } => {
                    if value.data_type() != Some(*expected) {
                        errors.push(format!(
                            "field '{}' has wrong type, expected {}",
                            field, expected
                        ));
                    }
                }
                FieldRule::Email => {
                    if !validate_email(value) {
                        errors.push(format!("invalid email in field '{}'", field));
                    }
                }
                FieldRule::Numeric { min, max } => {
                    if !validate_numeric(value, *min, *max) {
                        errors.push(format!("invalid numeric value in field '{}'", field));
                    }
                }
                FieldRule::Date { format } => {
                    if !validate_date(value, format) {
                        errors.push(format!("invalid date in field '{}'", field));
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        ValidationResult::valid()
    } else {
        ValidationResult::invalid(errors)
    }
}

/// Check every row against the schema and aggregate the outcomes.
pub fn validate_table(table: &Table, schema: &Schema) -> ValidationReport {
    let mut report = ValidationReport::default();
    for row in table.rows() {
        let result = validate_row(&row, schema);
        if result.is_valid {
            report.valid_records += 1;
        } else {
            report.invalid_records += 1;
            report.row_errors.push(RowErrors {
                row: row.index(),
                errors: result.errors,
            });
        }
    }
    report
}

fn rule_rank(rule: &FieldRule) -> u8 {
    match rule {
        FieldRule::Type { .. } => 0,
        FieldRule::Email => 1,
        FieldRule::Numeric { .. } => 2,
        FieldRule::Date { .. } => 3,
    }
}
