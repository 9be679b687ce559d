//! Outcome types produced by the validation engine.

use serde::{Deserialize, Serialize};

/// The outcome of validating one row against a schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when no rule failed.
    pub is_valid: bool,
    /// Every rule failure, in rule-application order.
    pub errors: Vec<String>,
    /// Non-fatal findings. Modeled for callers; nothing appends to it yet.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A passing result.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// A failing result carrying the accumulated errors.
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
            warnings: Vec::new(),
        }
    }
}

/// The errors of one failing row, by table position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowErrors {
    pub row: usize,
    pub errors: Vec<String>,
}

/// Table-level aggregation of per-row validation outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid_records: usize,
    pub invalid_records: usize,
    /// One entry per failing row, in table order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub row_errors: Vec<RowErrors>,
}

impl ValidationReport {
    /// True when every row passed.
    pub fn all_valid(&self) -> bool {
        self.invalid_records == 0
    }
}
