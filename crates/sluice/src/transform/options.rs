//! Policy enums accepted by the transformation operations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EtlError;

/// Which occurrence survives when rows are duplicates of each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepPolicy {
    /// Keep the first occurrence.
    #[default]
    First,
    /// Keep the last occurrence.
    Last,
    /// Drop every row that has a duplicate anywhere.
    None,
}

impl KeepPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeepPolicy::First => "first",
            KeepPolicy::Last => "last",
            KeepPolicy::None => "none",
        }
    }
}

impl fmt::Display for KeepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeepPolicy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(KeepPolicy::First),
            "last" => Ok(KeepPolicy::Last),
            "none" => Ok(KeepPolicy::None),
            other => Err(EtlError::Config(format!(
                "unknown keep policy '{}': expected first, last or none",
                other
            ))),
        }
    }
}

/// How missing values are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingStrategy {
    /// Delete rows containing any missing value in scope.
    #[default]
    Drop,
    /// Replace missing values with a caller-supplied constant.
    Fill,
    /// Replace missing values with the nearest earlier non-missing value.
    ForwardFill,
    /// Replace missing values with the nearest later non-missing value.
    BackwardFill,
}

impl MissingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingStrategy::Drop => "drop",
            MissingStrategy::Fill => "fill",
            MissingStrategy::ForwardFill => "forward_fill",
            MissingStrategy::BackwardFill => "backward_fill",
        }
    }
}

impl fmt::Display for MissingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissingStrategy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(MissingStrategy::Drop),
            "fill" => Ok(MissingStrategy::Fill),
            "forward_fill" | "ffill" => Ok(MissingStrategy::ForwardFill),
            "backward_fill" | "bfill" => Ok(MissingStrategy::BackwardFill),
            other => Err(EtlError::Config(format!(
                "unknown missing-value strategy '{}': expected drop, fill, forward_fill or backward_fill",
                other
            ))),
        }
    }
}

/// Scaling method for numeric normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizeMethod {
    /// Rescale into `[0, 1]` using the column minimum and maximum.
    #[default]
    #[serde(rename = "minmax")]
    MinMax,
    /// Center on the mean and divide by the standard deviation.
    #[serde(rename = "zscore")]
    ZScore,
}

impl NormalizeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizeMethod::MinMax => "minmax",
            NormalizeMethod::ZScore => "zscore",
        }
    }
}

impl fmt::Display for NormalizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizeMethod {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minmax" | "min_max" => Ok(NormalizeMethod::MinMax),
            "zscore" | "z_score" => Ok(NormalizeMethod::ZScore),
            other => Err(EtlError::Config(format!(
                "unknown normalization method '{}': expected minmax or zscore",
                other
            ))),
        }
    }
}

/// Aggregation function applied per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    /// Arithmetic mean of non-missing numeric values.
    Mean,
    /// Sum of non-missing numeric values.
    Sum,
    /// Count of non-missing values.
    Count,
    /// Smallest non-missing numeric value.
    Min,
    /// Largest non-missing numeric value.
    Max,
}

impl Aggregate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Mean => "mean",
            Aggregate::Sum => "sum",
            Aggregate::Count => "count",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregate {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "avg" => Ok(Aggregate::Mean),
            "sum" => Ok(Aggregate::Sum),
            "count" => Ok(Aggregate::Count),
            "min" => Ok(Aggregate::Min),
            "max" => Ok(Aggregate::Max),
            other => Err(EtlError::Config(format!(
                "unknown aggregation '{}': expected mean, sum, count, min or max",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_policy_parsing() {
        assert_eq!("first".parse::<KeepPolicy>().unwrap(), KeepPolicy::First);
        assert_eq!("LAST".parse::<KeepPolicy>().unwrap(), KeepPolicy::Last);
        assert!("second".parse::<KeepPolicy>().is_err());
    }

    #[test]
    fn test_missing_strategy_aliases() {
        assert_eq!(
            "ffill".parse::<MissingStrategy>().unwrap(),
            MissingStrategy::ForwardFill
        );
        assert_eq!(
            "backward_fill".parse::<MissingStrategy>().unwrap(),
            MissingStrategy::BackwardFill
        );
        assert!("interpolate".parse::<MissingStrategy>().is_err());
    }

    #[test]
    fn test_normalize_method_serde_names() {
        let json = serde_json::to_string(&NormalizeMethod::ZScore).unwrap();
        assert_eq!(json, r#""zscore""#);
        let back: NormalizeMethod = serde_json::from_str(r#""minmax""#).unwrap();
        assert_eq!(back, NormalizeMethod::MinMax);
    }

    #[test]
    fn test_aggregate_parsing() {
        assert_eq!("mean".parse::<Aggregate>().unwrap(), Aggregate::Mean);
        assert_eq!("avg".parse::<Aggregate>().unwrap(), Aggregate::Mean);
        assert!("median".parse::<Aggregate>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(KeepPolicy::default(), KeepPolicy::First);
        assert_eq!(MissingStrategy::default(), MissingStrategy::Drop);
        assert_eq!(NormalizeMethod::default(), NormalizeMethod::MinMax);
    }
}
