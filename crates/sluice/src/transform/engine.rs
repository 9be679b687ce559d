//! Stateless transformation operations over a [`Table`].

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::error::{EtlError, Result};
use crate::table::{DataType, Row, Table, Value, ValueKey};
use crate::transform::{Aggregate, KeepPolicy, MissingStrategy, NormalizeMethod};

/// Stateless executor for the transformation operations.
///
/// Every operation either completes and leaves the table satisfying the
/// row-count invariant, or fails and leaves the table untouched. The only
/// soft failures are the two documented ones: unknown names passed to
/// [`select_columns`](Transformer::select_columns) and per-column failures
/// in [`convert_data_types`](Transformer::convert_data_types).
#[derive(Debug, Clone)]
pub struct Transformer;

impl Transformer {
    pub fn new() -> Self {
        Self
    }

    /// Remove rows that are duplicates of each other on the `subset`
    /// columns (all columns when absent). Survivors keep their original
    /// order. Returns the number of rows removed.
    pub fn remove_duplicates(
        &self,
        table: &mut Table,
        subset: Option<&[&str]>,
        keep: KeepPolicy,
    ) -> Result<usize> {
        let key_columns: Vec<&str> = match subset {
            Some(columns) => {
                if columns.is_empty() {
                    return Err(EtlError::Config(
                        "remove_duplicates: subset must name at least one column".to_string(),
                    ));
                }
                for &column in columns {
                    if !table.contains_column(column) {
                        return Err(EtlError::column("remove_duplicates", column));
                    }
                }
                columns.to_vec()
            }
            None => table.column_names(),
        };

        let row_count = table.row_count();
        let keys: Vec<Vec<ValueKey>> = (0..row_count)
            .map(|row| {
                key_columns
                    .iter()
                    .filter_map(|column| table.get(row, column))
                    .map(Value::key)
                    .collect()
            })
            .collect();

        let mask = match keep {
            KeepPolicy::First => {
                let mut seen = HashSet::new();
                keys.iter().map(|key| seen.insert(key.clone())).collect::<Vec<_>>()
            }
            KeepPolicy::Last => {
                let mut seen = HashSet::new();
                let mut mask: Vec<bool> = keys
                    .iter()
                    .rev()
                    .map(|key| seen.insert(key.clone()))
                    .collect();
                mask.reverse();
                mask
            }
            KeepPolicy::None => {
                let mut counts: HashMap<&Vec<ValueKey>, usize> = HashMap::new();
                for key in &keys {
                    *counts.entry(key).or_insert(0) += 1;
                }
                keys.iter().map(|key| counts[key] == 1).collect()
            }
        };

        let removed = mask.iter().filter(|&&kept| !kept).count();
        table.retain_rows(&mask);
        info!("Removed {} duplicate rows (keep={})", removed, keep);
        Ok(removed)
    }

    /// Resolve missing values across the whole table. Returns the number
    /// of Null cells present before the operation; zero means nothing was
    /// touched. `fill` requires a fill value; forward/backward fill leave
    /// a cell Null when no donor exists in its column.
    pub fn handle_missing_values(
        &self,
        table: &mut Table,
        strategy: MissingStrategy,
        fill_value: Option<&Value>,
    ) -> Result<usize> {
        let missing_before: usize = table
            .columns()
            .values()
            .map(|column| column.iter().filter(|v| v.is_null()).count())
            .sum();
        if missing_before == 0 {
            return Ok(0);
        }

        match strategy {
            MissingStrategy::Drop => {
                let mask: Vec<bool> = (0..table.row_count())
                    .map(|row| {
                        !table
                            .columns()
                            .values()
                            .any(|column| column[row].is_null())
                    })
                    .collect();
                table.retain_rows(&mask);
            }
            MissingStrategy::Fill => {
                let fill = fill_value.ok_or_else(|| {
                    EtlError::Config(
                        "handle_missing_values: fill strategy requires a fill value".to_string(),
                    )
                })?;
                for column in table.columns_mut().values_mut() {
                    for value in column.iter_mut() {
                        if value.is_null() {
                            *value = fill.clone();
                        }
                    }
                }
            }
            MissingStrategy::ForwardFill => {
                for column in table.columns_mut().values_mut() {
                    let mut donor: Option<Value> = None;
                    for value in column.iter_mut() {
                        if value.is_null() {
                            if let Some(ref d) = donor {
                                *value = d.clone();
                            }
                        } else {
                            donor = Some(value.clone());
                        }
                    }
                }
            }
            MissingStrategy::BackwardFill => {
                for column in table.columns_mut().values_mut() {
                    let mut donor: Option<Value> = None;
                    for value in column.iter_mut().rev() {
                        if value.is_null() {
                            if let Some(ref d) = donor {
                                *value = d.clone();
                            }
                        } else {
                            donor = Some(value.clone());
                        }
                    }
                }
            }
        }

        info!(
            "Handled {} missing values with {} strategy",
            missing_before, strategy
        );
        Ok(missing_before)
    }

    /// Rename columns per the ordered mapping, entry by entry. Renaming
    /// onto a name another column already holds removes that column; the
    /// renamed column keeps its own position. An unknown source column is
    /// an error and leaves the table untouched. Returns the number of
    /// mapping entries applied.
    pub fn rename_columns(&self, table: &mut Table, mapping: &[(&str, &str)]) -> Result<usize> {
        // Dry run over the names alone, so a bad entry cannot leave the
        // table half-renamed.
        let mut probe: Vec<(String, ())> = table
            .columns()
            .keys()
            .map(|name| (name.clone(), ()))
            .collect();
        apply_renames(&mut probe, mapping)?;

        let mut columns: Vec<(String, Vec<Value>)> = table.columns_mut().drain(..).collect();
        apply_renames(&mut columns, mapping)?;
        *table.columns_mut() = columns.into_iter().collect();

        info!("Renamed {} columns", mapping.len());
        Ok(mapping.len())
    }

    /// Project the table to the requested columns, in the requested order.
    /// Unknown names are skipped with a warning. Returns the number of
    /// columns kept.
    pub fn select_columns(&self, table: &mut Table, names: &[&str]) -> Result<usize> {
        let mut source = std::mem::take(table.columns_mut());
        let mut kept: IndexMap<String, Vec<Value>> = IndexMap::new();
        let mut missing: Vec<&str> = Vec::new();
        for &name in names {
            if let Some((key, values)) = source.swap_remove_entry(name) {
                kept.insert(key, values);
            } else if !kept.contains_key(name) {
                missing.push(name);
            }
        }
        if !missing.is_empty() {
            warn!("Skipping unknown columns in select: {:?}", missing);
        }
        let kept_count = kept.len();
        *table.columns_mut() = kept;
        info!("Selected {} columns", kept_count);
        Ok(kept_count)
    }

    /// Keep only the rows the predicate accepts. Returns the number of
    /// rows removed.
    pub fn filter_rows<F>(&self, table: &mut Table, predicate: F) -> Result<usize>
    where
        F: Fn(&Row<'_>) -> bool,
    {
        let mask: Vec<bool> = table.rows().map(|row| predicate(&row)).collect();
        let removed = mask.iter().filter(|&&kept| !kept).count();
        table.retain_rows(&mask);
        info!("Filtered out {} rows, {} remaining", removed, table.row_count());
        Ok(removed)
    }

    /// Convert columns to the requested types, best-effort per column: a
    /// column whose cells refuse the conversion, or a name the table does
    /// not have, is logged and left untouched. Returns the number of
    /// columns converted.
    pub fn convert_data_types(
        &self,
        table: &mut Table,
        mapping: &[(&str, DataType)],
    ) -> Result<usize> {
        let mut converted = 0;
        for &(name, to) in mapping {
            let Some(values) = table.column(name) else {
                warn!("Cannot convert column '{}': column not found", name);
                continue;
            };
            let mut coerced = Vec::with_capacity(values.len());
            let mut refused = false;
            for value in values {
                match value.coerce(to) {
                    Some(v) => coerced.push(v),
                    None => {
                        refused = true;
                        break;
                    }
                }
            }
            if refused {
                warn!("Cannot convert column '{}' to {}: incompatible values", name, to);
                continue;
            }
            if let Some(column) = table.column_mut(name) {
                *column = coerced;
            }
            converted += 1;
        }
        info!("Converted {} of {} columns", converted, mapping.len());
        Ok(converted)
    }

    /// Normalize a numeric column in place. Null cells pass through; any
    /// non-numeric cell is an error before any mutation. Output cells are
    /// Float. Returns the number of values normalized.
    pub fn normalize_column(
        &self,
        table: &mut Table,
        name: &str,
        method: NormalizeMethod,
    ) -> Result<usize> {
        let values = table
            .column(name)
            .ok_or_else(|| EtlError::column("normalize_column", name))?;

        let mut numbers = Vec::with_capacity(values.len());
        for value in values {
            if value.is_null() {
                continue;
            }
            match value.as_f64() {
                Some(v) => numbers.push(v),
                None => {
                    return Err(EtlError::Transform {
                        operation: "normalize_column".to_string(),
                        message: format!("column '{}' contains non-numeric values", name),
                    });
                }
            }
        }
        if numbers.is_empty() {
            return Ok(0);
        }

        let normalized: Vec<Value> = match method {
            NormalizeMethod::MinMax => {
                let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
                let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let range = max - min;
                if range == 0.0 {
                    warn!(
                        "Column '{}' has a degenerate range, minmax output set to 0.0",
                        name
                    );
                }
                values
                    .iter()
                    .map(|v| match v.as_f64() {
                        Some(_) if range == 0.0 => Value::Float(0.0),
                        Some(x) => Value::Float((x - min) / range),
                        None => Value::Null,
                    })
                    .collect()
            }
            NormalizeMethod::ZScore => {
                let n = numbers.len() as f64;
                let mean = numbers.iter().sum::<f64>() / n;
                let stddev = if numbers.len() < 2 {
                    0.0
                } else {
                    let variance =
                        numbers.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
                    variance.sqrt()
                };
                if stddev == 0.0 {
                    warn!(
                        "Column '{}' has zero standard deviation, zscore output set to 0.0",
                        name
                    );
                }
                values
                    .iter()
                    .map(|v| match v.as_f64() {
                        Some(_) if stddev == 0.0 => Value::Float(0.0),
                        Some(x) => Value::Float((x - mean) / stddev),
                        None => Value::Null,
                    })
                    .collect()
            }
        };

        let count = numbers.len();
        if let Some(column) = table.column_mut(name) {
            *column = normalized;
        }
        info!("Normalized {} values in column '{}' ({})", count, name, method);
        Ok(count)
    }

    /// Compute a new column from each row. An existing column of the same
    /// name is overwritten in place; otherwise the column is appended.
    /// Returns the number of rows computed.
    pub fn add_calculated_column<F>(&self, table: &mut Table, name: &str, row_fn: F) -> Result<usize>
    where
        F: Fn(&Row<'_>) -> Value,
    {
        let values: Vec<Value> = table.rows().map(|row| row_fn(&row)).collect();
        let count = values.len();
        table.insert_column(name, values)?;
        info!("Added calculated column '{}' over {} rows", name, count);
        Ok(count)
    }

    /// Group rows by equality on the `group_by` columns and compute one
    /// aggregate column per `(column, function)` entry, named
    /// `{column}_{function}`. Groups appear in first-seen order; the
    /// grouped result replaces the table. Returns the group count.
    pub fn aggregate_data(
        &self,
        table: &mut Table,
        group_by: &[&str],
        aggregations: &[(&str, Aggregate)],
    ) -> Result<usize> {
        if group_by.is_empty() {
            return Err(EtlError::Config(
                "aggregate_data: at least one group column is required".to_string(),
            ));
        }
        for &column in group_by {
            if !table.contains_column(column) {
                return Err(EtlError::column("aggregate_data", column));
            }
        }
        for &(column, function) in aggregations {
            let values = table
                .column(column)
                .ok_or_else(|| EtlError::column("aggregate_data", column))?;
            if function != Aggregate::Count {
                let non_numeric = values
                    .iter()
                    .any(|v| !v.is_null() && v.as_f64().is_none());
                if non_numeric {
                    return Err(EtlError::Transform {
                        operation: "aggregate_data".to_string(),
                        message: format!("column '{}': {} requires numeric values", column, function),
                    });
                }
            }
        }

        // First-seen key order: representative key values + member rows.
        let mut groups: IndexMap<Vec<ValueKey>, (Vec<Value>, Vec<usize>)> = IndexMap::new();
        for row in 0..table.row_count() {
            let key: Vec<ValueKey> = group_by
                .iter()
                .filter_map(|column| table.get(row, column))
                .map(Value::key)
                .collect();
            let entry = groups.entry(key).or_insert_with(|| {
                let representative = group_by
                    .iter()
                    .filter_map(|column| table.get(row, column))
                    .cloned()
                    .collect();
                (representative, Vec::new())
            });
            entry.1.push(row);
        }

        let before_rows = table.row_count();
        let mut output: Vec<(String, Vec<Value>)> = Vec::new();
        for (position, &column) in group_by.iter().enumerate() {
            let values = groups
                .values()
                .map(|(representative, _)| representative[position].clone())
                .collect();
            output.push((column.to_string(), values));
        }
        for &(column, function) in aggregations {
            let source = table.column(column).unwrap_or(&[]);
            let values = groups
                .values()
                .map(|(_, rows)| aggregate_group(source, rows, function))
                .collect();
            output.push((format!("{}_{}", column, function), values));
        }

        let group_count = groups.len();
        *table = Table::from_columns(output)?;
        info!("Aggregated {} rows into {} groups", before_rows, group_count);
        Ok(group_count)
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply a rename mapping to an ordered column list, entry by entry.
/// Generic over the payload so the same walk can dry-run over names.
fn apply_renames<T>(columns: &mut Vec<(String, T)>, mapping: &[(&str, &str)]) -> Result<()> {
    for &(old, new) in mapping {
        let index = columns
            .iter()
            .position(|(name, _)| name.as_str() == old)
            .ok_or_else(|| EtlError::column("rename_columns", old))?;
        columns[index].0 = new.to_string();
        let duplicate = columns
            .iter()
            .enumerate()
            .find(|(i, (name, _))| *i != index && name.as_str() == new)
            .map(|(i, _)| i);
        if let Some(duplicate) = duplicate {
            columns.remove(duplicate);
        }
    }
    Ok(())
}

/// One aggregate over the group's rows of a column. Null cells are
/// skipped; a group with no usable cells yields Null (count yields 0).
fn aggregate_group(source: &[Value], rows: &[usize], function: Aggregate) -> Value {
    if function == Aggregate::Count {
        let count = rows.iter().filter(|&&row| !source[row].is_null()).count();
        return Value::Int(count as i64);
    }

    let mut numbers = Vec::new();
    let mut all_int = true;
    for &row in rows {
        match &source[row] {
            Value::Null => {}
            value => {
                if !matches!(value, Value::Int(_)) {
                    all_int = false;
                }
                if let Some(x) = value.as_f64() {
                    numbers.push(x);
                }
            }
        }
    }
    if numbers.is_empty() {
        return Value::Null;
    }

    match function {
        Aggregate::Mean => Value::Float(numbers.iter().sum::<f64>() / numbers.len() as f64),
        Aggregate::Sum => integerish(numbers.iter().sum(), all_int),
        Aggregate::Min => integerish(numbers.iter().copied().fold(f64::INFINITY, f64::min), all_int),
        Aggregate::Max => {
            integerish(numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max), all_int)
        }
        Aggregate::Count => Value::Int(numbers.len() as i64),
    }
}

/// Keep integer typing through sum/min/max when every input was Int.
fn integerish(x: f64, all_int: bool) -> Value {
    if all_int && x.is_finite() && x.fract() == 0.0 && x.abs() < 9e15 {
        Value::Int(x as i64)
    } else {
        Value::Float(x)
    }
}
