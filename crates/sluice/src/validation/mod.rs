//! Validation engine: value predicates, row schemas and report types.

mod result;
mod schema;
mod validators;

pub use result::{RowErrors, ValidationReport, ValidationResult};
pub use schema::{FieldRule, Schema};
pub use validators::{
    validate_date, validate_email, validate_in_list, validate_numeric, validate_phone,
    validate_row, validate_string_length, validate_table,
};
