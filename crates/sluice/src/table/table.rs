//! Column-oriented in-memory table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};
use crate::table::Value;

/// An in-memory dataset: named columns in insertion order, all of equal
/// length. The row count is the shared column length; an empty table has
/// zero columns and zero rows.
///
/// Serializes as a bare map of column name to cells. Deserialization
/// runs the same shape checks as [`Table::from_columns`], so a ragged
/// payload is refused.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IndexMap<String, Vec<Value>>", into = "IndexMap<String, Vec<Value>>")]
pub struct Table {
    columns: IndexMap<String, Vec<Value>>,
}

impl Table {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from named columns, preserving their order.
    ///
    /// Fails with a configuration error when columns have differing
    /// lengths or a name repeats.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let mut table = Table::new();
        for (name, values) in columns {
            let name = name.into();
            if table.columns.contains_key(&name) {
                return Err(EtlError::Config(format!(
                    "duplicate column name '{}'",
                    name
                )));
            }
            if !table.columns.is_empty() && values.len() != table.row_count() {
                return Err(EtlError::Config(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    table.row_count()
                )));
            }
            table.columns.insert(name, values);
        }
        Ok(table)
    }

    /// Number of rows (the shared column length).
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |(_, v)| v.len())
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Whether a column with this name exists.
    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// The values of a column, if present.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// A single cell, if both row and column exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.columns.get(column).and_then(|v| v.get(row))
    }

    /// Insert or replace a column. A replaced column keeps its position;
    /// a new column is appended. The length must match the current row
    /// count unless the table is empty.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> Result<()> {
        let name = name.into();
        if !self.columns.is_empty()
            && !self.columns.contains_key(&name)
            && values.len() != self.row_count()
        {
            return Err(EtlError::Config(format!(
                "column '{}' has {} values, expected {}",
                name,
                values.len(),
                self.row_count()
            )));
        }
        if let Some(existing) = self.columns.get_mut(&name) {
            if values.len() != existing.len() {
                return Err(EtlError::Config(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    existing.len()
                )));
            }
            *existing = values;
        } else {
            self.columns.insert(name, values);
        }
        Ok(())
    }

    /// A borrow view over one row.
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        if index < self.row_count() {
            Some(Row { table: self, index })
        } else {
            None
        }
    }

    /// Iterate over all rows as borrow views.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.row_count()).map(move |index| Row { table: self, index })
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut Vec<Value>> {
        self.columns.get_mut(name)
    }

    pub(crate) fn columns(&self) -> &IndexMap<String, Vec<Value>> {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> &mut IndexMap<String, Vec<Value>> {
        &mut self.columns
    }

    /// Keep only the rows whose mask entry is true. The mask length must
    /// equal the row count; callers build it in the same pass that sizes it.
    pub(crate) fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.row_count());
        for values in self.columns.values_mut() {
            let mut idx = 0;
            values.retain(|_| {
                let keep_row = keep[idx];
                idx += 1;
                keep_row
            });
        }
    }
}

impl TryFrom<IndexMap<String, Vec<Value>>> for Table {
    type Error = EtlError;

    fn try_from(columns: IndexMap<String, Vec<Value>>) -> Result<Self> {
        Table::from_columns(columns)
    }
}

impl From<Table> for IndexMap<String, Vec<Value>> {
    fn from(table: Table) -> Self {
        table.columns
    }
}

/// A borrowed view over one table row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    /// Position of this row in the table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The cell under the given column, if the column exists.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.table.get(self.index, column)
    }

    /// Whether the row has a cell under this column.
    pub fn contains(&self, column: &str) -> bool {
        self.table.contains_column(column)
    }

    /// The row's values in column order.
    pub fn values(&self) -> impl Iterator<Item = &'a Value> + '_ {
        self.table
            .columns
            .values()
            .filter_map(move |col| col.get(self.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table() -> Table {
        Table::from_columns(vec![
            ("id", vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            (
                "name",
                vec![
                    Value::from("alice"),
                    Value::from("bob"),
                    Value::from("carol"),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_columns_preserves_order() {
        let table = make_table();
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_from_columns_rejects_ragged() {
        let result = Table::from_columns(vec![
            ("a", vec![Value::Int(1), Value::Int(2)]),
            ("b", vec![Value::Int(3)]),
        ]);
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_from_columns_rejects_duplicate_names() {
        let result = Table::from_columns(vec![
            ("a", vec![Value::Int(1)]),
            ("a", vec![Value::Int(2)]),
        ]);
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new();
        assert!(table.is_empty());
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn test_get_cell() {
        let table = make_table();
        assert_eq!(table.get(1, "name"), Some(&Value::from("bob")));
        assert_eq!(table.get(5, "name"), None);
        assert_eq!(table.get(0, "missing"), None);
    }

    #[test]
    fn test_insert_column_replaces_in_place() {
        let mut table = make_table();
        table
            .insert_column("id", vec![Value::Int(10), Value::Int(20), Value::Int(30)])
            .unwrap();
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(table.get(0, "id"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_insert_column_length_checked() {
        let mut table = make_table();
        let result = table.insert_column("extra", vec![Value::Int(1)]);
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_row_view() {
        let table = make_table();
        let row = table.row(2).unwrap();
        assert_eq!(row.index(), 2);
        assert_eq!(row.get("name"), Some(&Value::from("carol")));
        assert!(row.contains("id"));
        assert!(!row.contains("missing"));
        let values: Vec<_> = row.values().collect();
        assert_eq!(values, vec![&Value::Int(3), &Value::from("carol")]);
    }

    #[test]
    fn test_rows_iterator() {
        let table = make_table();
        let ids: Vec<_> = table
            .rows()
            .map(|row| row.get("id").cloned().unwrap())
            .collect();
        assert_eq!(ids, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_retain_rows() {
        let mut table = make_table();
        table.retain_rows(&[true, false, true]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(1, "name"), Some(&Value::from("carol")));
    }

    #[test]
    fn test_serde_round_trip() {
        let table = make_table();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"id":[1,2,3],"name":["alice","bob","carol"]}"#);
        let back: Table = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.column_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_deserialize_rejects_ragged_columns() {
        let err = serde_json::from_str::<Table>(r#"{"a": [1, 2], "b": [null]}"#).unwrap_err();
        assert!(err.to_string().contains("expected 2"));
    }
}
