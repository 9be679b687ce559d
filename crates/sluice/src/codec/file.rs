//! The codec seam and the default CSV/JSON file codec.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::codec::source::{Format, SourceInfo};
use crate::error::{EtlError, Result};
use crate::table::{DataType, Table, Value};

/// How tables move between files and memory. The pipeline core never
/// inspects file bytes itself; it talks to this seam.
pub trait TableCodec {
    /// Read a table from the source. Format from the hint or the suffix.
    fn extract(&mut self, source: &Path, format: Option<Format>) -> Result<Table>;

    /// Write the table to the destination. Format from the hint or the
    /// suffix.
    fn load(&self, table: &Table, destination: &Path, format: Option<Format>) -> Result<()>;

    /// Provenance of the most recent extraction, for codecs that track it.
    fn source_info(&self) -> Option<&SourceInfo> {
        None
    }
}

/// Default codec: CSV and JSON files on the local filesystem, with
/// per-cell typing on read and provenance capture.
#[derive(Debug, Clone, Default)]
pub struct FileCodec {
    last_source: Option<SourceInfo>,
}

impl FileCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableCodec for FileCodec {
    fn extract(&mut self, source: &Path, format: Option<Format>) -> Result<Table> {
        let format = Format::resolve(source, format)?;

        let mut file = File::open(source).map_err(|e| EtlError::io(source, e))?;
        let size_bytes = file
            .metadata()
            .map_err(|e| EtlError::io(source, e))?
            .len();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| EtlError::io(source, e))?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let table = match format {
            Format::Csv => read_csv(&contents),
            Format::Json => read_json(&contents),
        }?;

        let source_info = SourceInfo::new(
            source.to_path_buf(),
            hash,
            size_bytes,
            format,
            table.row_count(),
            table.column_count(),
        );
        info!(
            "Extracted {} rows x {} columns from '{}' ({})",
            source_info.row_count, source_info.column_count, source_info.file, format
        );
        self.last_source = Some(source_info);

        Ok(table)
    }

    fn load(&self, table: &Table, destination: &Path, format: Option<Format>) -> Result<()> {
        let format = Format::resolve(destination, format)?;
        if table.column_count() == 0 {
            return Err(EtlError::EmptyData(
                "no columns to write".to_string(),
            ));
        }

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| EtlError::io(parent, e))?;
            }
        }

        match format {
            Format::Csv => write_csv(table, destination),
            Format::Json => write_json(table, destination),
        }?;

        info!(
            "Loaded {} rows x {} columns into '{}' ({})",
            table.row_count(),
            table.column_count(),
            destination.display(),
            format
        );
        Ok(())
    }

    fn source_info(&self) -> Option<&SourceInfo> {
        self.last_source.as_ref()
    }
}

/// Markers a CSV cell may use for a missing value.
fn is_missing(cell: &str) -> bool {
    cell.is_empty()
        || cell.eq_ignore_ascii_case("na")
        || cell.eq_ignore_ascii_case("n/a")
        || cell.eq_ignore_ascii_case("null")
        || cell.eq_ignore_ascii_case("none")
        || cell.eq_ignore_ascii_case("nan")
}

/// Type a raw CSV cell: missing marker, then Int, Float, Bool, else Str.
fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if is_missing(trimmed) {
        return Value::Null;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Value::Int(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return Value::Float(v);
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::Str(raw.to_string())
}

/// Restore the homogeneous-typed column guarantee after per-cell typing:
/// Int mixed with Float promotes to Float; any other mix demotes the
/// non-null cells to Str.
fn harmonize_column(column: &mut Vec<Value>) {
    let distinct: HashSet<DataType> = column.iter().filter_map(Value::data_type).collect();
    if distinct.len() <= 1 {
        return;
    }
    if distinct.len() == 2
        && distinct.contains(&DataType::Int)
        && distinct.contains(&DataType::Float)
    {
        for value in column.iter_mut() {
            if let Value::Int(v) = value {
                *value = Value::Float(*v as f64);
            }
        }
    } else {
        for value in column.iter_mut() {
            if let Some(demoted) = value.coerce(DataType::String) {
                *value = demoted;
            }
        }
    }
}

fn read_csv(bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
    if headers.is_empty() {
        return Err(EtlError::EmptyData("no columns found".to_string()));
    }

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for result in reader.records() {
        let record = result?;
        for (index, column) in columns.iter_mut().enumerate() {
            column.push(parse_cell(record.get(index).unwrap_or("")));
        }
    }
    for column in &mut columns {
        harmonize_column(column);
    }

    Table::from_columns(headers.into_iter().zip(columns))
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| EtlError::io(path, e))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    writer.write_record(table.column_names())?;
    for row in table.rows() {
        let record: Vec<String> = row.values().map(|v| v.to_string()).collect();
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|e| EtlError::io(path, e))?;
    Ok(())
}

fn read_json(bytes: &[u8]) -> Result<Table> {
    let records: Vec<IndexMap<String, Value>> = serde_json::from_slice(bytes)?;

    // Column set is the union of record keys, in first-seen order.
    let mut columns: IndexMap<String, Vec<Value>> = IndexMap::new();
    for record in &records {
        for key in record.keys() {
            if !columns.contains_key(key) {
                columns.insert(key.clone(), Vec::new());
            }
        }
    }
    if columns.is_empty() {
        return Err(EtlError::EmptyData("no columns found".to_string()));
    }

    for record in &records {
        for (name, column) in columns.iter_mut() {
            column.push(record.get(name).cloned().unwrap_or(Value::Null));
        }
    }

    Table::from_columns(columns)
}

fn write_json(table: &Table, path: &Path) -> Result<()> {
    let names = table.column_names();
    let records: Vec<IndexMap<&str, &Value>> = table
        .rows()
        .map(|row| names.iter().copied().zip(row.values()).collect())
        .collect();

    let file = File::create(path).map_err(|e| EtlError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush().map_err(|e| EtlError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_typing() {
        assert_eq!(parse_cell("42"), Value::Int(42));
        assert_eq!(parse_cell("-3"), Value::Int(-3));
        assert_eq!(parse_cell("2.5"), Value::Float(2.5));
        assert_eq!(parse_cell("true"), Value::Bool(true));
        assert_eq!(parse_cell("FALSE"), Value::Bool(false));
        assert_eq!(parse_cell("hello"), Value::Str("hello".to_string()));
        assert_eq!(parse_cell(""), Value::Null);
        assert_eq!(parse_cell("N/A"), Value::Null);
        assert_eq!(parse_cell("NaN"), Value::Null);
    }

    #[test]
    fn test_read_csv_types_columns() {
        let data = b"name,age,score\nalice,30,1.5\nbob,25,2.5\n";
        let table = read_csv(data).unwrap();
        assert_eq!(table.column_names(), vec!["name", "age", "score"]);
        assert_eq!(table.get(0, "name"), Some(&Value::from("alice")));
        assert_eq!(table.get(1, "age"), Some(&Value::Int(25)));
        assert_eq!(table.get(1, "score"), Some(&Value::Float(2.5)));
    }

    #[test]
    fn test_read_csv_missing_markers() {
        let data = b"a,b\n1,\n2,na\n3,x\n";
        let table = read_csv(data).unwrap();
        assert_eq!(table.get(0, "b"), Some(&Value::Null));
        assert_eq!(table.get(1, "b"), Some(&Value::Null));
        assert_eq!(table.get(2, "b"), Some(&Value::from("x")));
    }

    #[test]
    fn test_read_csv_promotes_mixed_numeric() {
        let data = b"x\n1\n2.5\n3\n";
        let table = read_csv(data).unwrap();
        assert_eq!(
            table.column("x").unwrap(),
            &[Value::Float(1.0), Value::Float(2.5), Value::Float(3.0)]
        );
    }

    #[test]
    fn test_read_csv_demotes_mixed_to_string() {
        let data = b"x\n1\nhello\n";
        let table = read_csv(data).unwrap();
        assert_eq!(
            table.column("x").unwrap(),
            &[Value::from("1"), Value::from("hello")]
        );
    }

    #[test]
    fn test_harmonize_keeps_nulls() {
        let mut column = vec![Value::Int(1), Value::Null, Value::Float(2.5)];
        harmonize_column(&mut column);
        assert_eq!(column, vec![Value::Float(1.0), Value::Null, Value::Float(2.5)]);
    }

    #[test]
    fn test_read_csv_headers_only() {
        let data = b"a,b\n";
        let table = read_csv(data).unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_read_json_union_of_keys() {
        let data = br#"[{"a": 1, "b": "x"}, {"a": 2, "c": true}]"#;
        let table = read_json(data).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
        assert_eq!(table.get(1, "b"), Some(&Value::Null));
        assert_eq!(table.get(0, "c"), Some(&Value::Null));
        assert_eq!(table.get(1, "c"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_read_json_empty_array() {
        let result = read_json(b"[]");
        assert!(matches!(result, Err(EtlError::EmptyData(_))));
    }

    #[test]
    fn test_read_json_rejects_non_array() {
        let result = read_json(br#"{"a": 1}"#);
        assert!(matches!(result, Err(EtlError::Json(_))));
    }
}
