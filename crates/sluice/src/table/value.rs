//! Cell values and the canonical column types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EtlError;

/// Canonical data types a column can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Whole numbers.
    Int,
    /// Floating-point numbers.
    Float,
    /// Text values.
    String,
    /// Boolean values.
    Bool,
}

impl DataType {
    /// Short lowercase name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Bool => "bool",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "int" | "integer" => Ok(DataType::Int),
            "float" | "double" => Ok(DataType::Float),
            "string" | "str" => Ok(DataType::String),
            "bool" | "boolean" => Ok(DataType::Bool),
            other => Err(EtlError::Config(format!(
                "unknown data type '{}': expected int, float, string or bool",
                other
            ))),
        }
    }
}

/// A single cell value.
///
/// `Null` is the distinguished missing marker: distinct from the empty
/// string, from `0` and from `false`. Serialized untagged, so JSON
/// `null`/`true`/`3`/`3.5`/`"x"` map directly onto the variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Text.
    Str(String),
}

impl Value {
    /// Returns true for the missing marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type of a non-null value.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Bool),
            Value::Int(_) => Some(DataType::Int),
            Value::Float(_) => Some(DataType::Float),
            Value::Str(_) => Some(DataType::String),
        }
    }

    /// Numeric view of the value. `Int` and `Float` only; everything else
    /// (including numeric-looking strings) is not a number here.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String view of the value, for `Str` variants only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Convert this value to the given type, where a sensible conversion
    /// exists. `Null` stays `Null` under every target. Returns `None` when
    /// the value refuses the conversion (e.g. `"abc"` to int).
    pub fn coerce(&self, to: DataType) -> Option<Value> {
        match (self, to) {
            (Value::Null, _) => Some(Value::Null),

            (Value::Int(v), DataType::Int) => Some(Value::Int(*v)),
            (Value::Int(v), DataType::Float) => Some(Value::Float(*v as f64)),
            (Value::Int(v), DataType::String) => Some(Value::Str(v.to_string())),
            (Value::Int(v), DataType::Bool) => Some(Value::Bool(*v != 0)),

            (Value::Float(v), DataType::Int) => float_to_int(*v).map(Value::Int),
            (Value::Float(v), DataType::Float) => Some(Value::Float(*v)),
            (Value::Float(v), DataType::String) => Some(Value::Str(format_float(*v))),
            (Value::Float(v), DataType::Bool) => Some(Value::Bool(*v != 0.0)),

            (Value::Bool(v), DataType::Int) => Some(Value::Int(i64::from(*v))),
            (Value::Bool(v), DataType::Float) => Some(Value::Float(if *v { 1.0 } else { 0.0 })),
            (Value::Bool(v), DataType::String) => Some(Value::Str(v.to_string())),
            (Value::Bool(v), DataType::Bool) => Some(Value::Bool(*v)),

            (Value::Str(s), DataType::Int) => parse_int(s).map(Value::Int),
            (Value::Str(s), DataType::Float) => s.trim().parse::<f64>().ok().map(Value::Float),
            (Value::Str(s), DataType::Bool) => parse_bool(s).map(Value::Bool),
            (Value::Str(s), DataType::String) => Some(Value::Str(s.clone())),
        }
    }

    /// Hashable equality key for dedup and grouping. Floats are
    /// canonicalized so that `-0.0 == 0.0` and all NaNs compare equal;
    /// `Null` compares equal to `Null`.
    pub(crate) fn key(&self) -> ValueKey {
        match self {
            Value::Null => ValueKey::Null,
            Value::Bool(v) => ValueKey::Bool(*v),
            Value::Int(v) => ValueKey::Int(*v),
            Value::Float(v) => {
                let canonical = if v.is_nan() {
                    f64::NAN
                } else if *v == 0.0 {
                    0.0
                } else {
                    *v
                };
                ValueKey::Float(canonical.to_bits())
            }
            Value::Str(s) => ValueKey::Str(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => f.write_str(&format_float(*v)),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Render a float the way a table writer expects: whole numbers keep one
/// decimal place (`1.0`, not `1`) so the value re-reads as a float.
fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Truncate to i64, refusing non-finite floats and values outside the
/// i64 range.
fn float_to_int(v: f64) -> Option<i64> {
    const BOUND: f64 = 9_223_372_036_854_775_808.0; // 2^63
    let t = v.trunc();
    if (-BOUND..BOUND).contains(&t) {
        Some(t as i64)
    } else {
        None
    }
}

/// Integer parse that also accepts whole-number float renderings ("3.0").
fn parse_int(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 => float_to_int(f),
        _ => None,
    }
}

/// Boolean parse over the common textual encodings.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "t" | "y" | "1" => Some(true),
        "false" | "no" | "f" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Hashable projection of a [`Value`], usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_is_distinct() {
        assert!(Value::Null.is_null());
        assert!(!Value::Str(String::new()).is_null());
        assert!(!Value::Int(0).is_null());
        assert!(!Value::Bool(false).is_null());
    }

    #[test]
    fn test_coerce_string_to_int() {
        assert_eq!(Value::from("42").coerce(DataType::Int), Some(Value::Int(42)));
        assert_eq!(Value::from("3.0").coerce(DataType::Int), Some(Value::Int(3)));
        assert_eq!(Value::from("3.5").coerce(DataType::Int), None);
        assert_eq!(Value::from("abc").coerce(DataType::Int), None);
    }

    #[test]
    fn test_coerce_preserves_null() {
        for ty in [DataType::Int, DataType::Float, DataType::String, DataType::Bool] {
            assert_eq!(Value::Null.coerce(ty), Some(Value::Null));
        }
    }

    #[test]
    fn test_coerce_bool_encodings() {
        assert_eq!(Value::from("yes").coerce(DataType::Bool), Some(Value::Bool(true)));
        assert_eq!(Value::from("0").coerce(DataType::Bool), Some(Value::Bool(false)));
        assert_eq!(Value::from("maybe").coerce(DataType::Bool), None);
    }

    #[test]
    fn test_float_truncation() {
        assert_eq!(Value::Float(3.9).coerce(DataType::Int), Some(Value::Int(3)));
        assert_eq!(Value::Float(-3.9).coerce(DataType::Int), Some(Value::Int(-3)));
        assert_eq!(Value::Float(f64::NAN).coerce(DataType::Int), None);
        assert_eq!(Value::Float(f64::INFINITY).coerce(DataType::Int), None);
    }

    #[test]
    fn test_float_to_int_refuses_out_of_range() {
        assert_eq!(Value::Float(1e300).coerce(DataType::Int), None);
        assert_eq!(Value::Float(-1e300).coerce(DataType::Int), None);
        assert_eq!(
            Value::Float(i64::MIN as f64).coerce(DataType::Int),
            Some(Value::Int(i64::MIN))
        );
        // i64::MAX as f64 rounds up to 2^63, one past the largest i64.
        assert_eq!(Value::Float(i64::MAX as f64).coerce(DataType::Int), None);
    }

    #[test]
    fn test_parse_int_refuses_out_of_range() {
        assert_eq!(
            Value::from("1e10").coerce(DataType::Int),
            Some(Value::Int(10_000_000_000))
        );
        assert_eq!(Value::from("1e300").coerce(DataType::Int), None);
        assert_eq!(Value::from("9223372036854775808").coerce(DataType::Int), None);
    }

    #[test]
    fn test_display_rendering() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Int(7).to_string(), "7");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_key_canonicalizes_floats() {
        assert_eq!(Value::Float(0.0).key(), Value::Float(-0.0).key());
        assert_eq!(Value::Float(f64::NAN).key(), Value::Float(f64::NAN).key());
        assert_eq!(Value::Null.key(), Value::Null.key());
        assert_ne!(Value::Int(1).key(), Value::Float(1.0).key());
    }

    #[test]
    fn test_data_type_parsing() {
        assert_eq!("int".parse::<DataType>().unwrap(), DataType::Int);
        assert_eq!("Integer".parse::<DataType>().unwrap(), DataType::Int);
        assert!("decimal".parse::<DataType>().is_err());
    }

    #[test]
    fn test_untagged_serde() {
        let values = vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(3),
            Value::Float(3.5),
            Value::Str("x".to_string()),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,true,3,3.5,"x"]"#);
        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
