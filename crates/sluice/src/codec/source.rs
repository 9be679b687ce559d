//! Formats and extraction provenance.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};

/// File formats the default codec understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }

    /// Resolve the effective format: an explicit hint wins, otherwise the
    /// path suffix decides.
    pub fn resolve(path: &Path, hint: Option<Format>) -> Result<Format> {
        if let Some(format) = hint {
            return Ok(format);
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .parse()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = EtlError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            other => Err(EtlError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Provenance of an extracted file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Format the file was read as.
    pub format: Format,
    /// Number of data rows extracted.
    pub row_count: usize,
    /// Number of columns extracted.
    pub column_count: usize,
    /// When the extraction happened.
    pub extracted_at: DateTime<Utc>,
}

impl SourceInfo {
    pub fn new(
        path: PathBuf,
        hash: String,
        size_bytes: u64,
        format: Format,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            hash,
            size_bytes,
            format,
            row_count,
            column_count,
            extracted_at: Utc::now(),
        }
    }
}
