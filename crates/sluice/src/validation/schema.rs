//! Declarative row schemas.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::table::DataType;

/// One validation rule for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FieldRule {
    /// The cell must carry exactly this type; Null never passes.
    Type { expected: DataType },
    /// The cell must be a well-formed email address.
    Email,
    /// The cell must be numeric, optionally within inclusive bounds.
    Numeric {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// The cell must parse under the given chrono `%`-format string.
    Date { format: String },
}

/// An ordered mapping from field name to the rules that field must pass.
/// Applied independently to each row; rules never see other rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: IndexMap<String, Vec<FieldRule>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field and its rules, replacing any prior declaration.
    pub fn with_field(mut self, name: impl Into<String>, rules: Vec<FieldRule>) -> Self {
        self.fields.insert(name.into(), rules);
        self
    }
}
