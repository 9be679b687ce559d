//! The chainable pipeline orchestrator.

use std::path::Path;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::codec::{FileCodec, Format, SourceInfo, TableCodec};
use crate::error::{EtlError, Result};
use crate::stats::{JsonStatsSink, PipelineStats, PipelineStatus, StatsSink};
use crate::table::{DataType, Row, Table, Value};
use crate::transform::{Aggregate, KeepPolicy, MissingStrategy, NormalizeMethod, Transformer};
use crate::validation::{validate_table, Schema, ValidationReport};

/// One ETL run: a table, the statistics that describe what happened to
/// it, and the codec and sink collaborators.
///
/// Transformation methods return `Result<&mut Self>` so calls chain;
/// every one of them requires a table (extract first) and counts toward
/// `transformations_applied`. A failed call leaves the table and stats
/// exactly as they were.
///
/// # Example
///
/// ```no_run
/// # use sluice::{KeepPolicy, MissingStrategy, Pipeline, Value};
/// # fn example() -> sluice::Result<()> {
/// let mut pipeline = Pipeline::new();
/// pipeline
///     .run()
///     .extract("input.csv", None)?
///     .remove_duplicates(None, KeepPolicy::First)?
///     .handle_missing_values(MissingStrategy::Fill, Some(&Value::Int(0)))?
///     .load("output.json", None)?;
/// pipeline.finish(None);
/// pipeline.save_stats("stats.json")?;
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    table: Option<Table>,
    stats: PipelineStats,
    transformer: Transformer,
    codec: Box<dyn TableCodec>,
    sink: Box<dyn StatsSink>,
    last_validation: Option<ValidationReport>,
}

impl Pipeline {
    /// A pipeline with the default file codec and JSON stats sink.
    pub fn new() -> Self {
        Self {
            table: None,
            stats: PipelineStats::new(),
            transformer: Transformer::new(),
            codec: Box::new(FileCodec::new()),
            sink: Box::new(JsonStatsSink::new()),
            last_validation: None,
        }
    }

    /// Substitute the codec used by `extract` and `load`.
    pub fn with_codec(mut self, codec: impl TableCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Substitute the sink used by `save_stats`.
    pub fn with_sink(mut self, sink: impl StatsSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Read a table through the codec, replacing any previous table and
    /// resetting `total_records` to the fresh row count.
    pub fn extract(
        &mut self,
        source: impl AsRef<Path>,
        format: Option<Format>,
    ) -> Result<&mut Self> {
        let table = self.codec.extract(source.as_ref(), format)?;
        self.stats.total_records = table.row_count();
        self.table = Some(table);
        self.last_validation = None;
        Ok(self)
    }

    /// See [`Transformer::remove_duplicates`]. Adds the removed rows to
    /// `duplicates_removed`.
    pub fn remove_duplicates(
        &mut self,
        subset: Option<&[&str]>,
        keep: KeepPolicy,
    ) -> Result<&mut Self> {
        let table = require(&mut self.table, "remove_duplicates")?;
        let removed = self.transformer.remove_duplicates(table, subset, keep)?;
        self.stats.duplicates_removed += removed;
        self.stats.transformations_applied += 1;
        Ok(self)
    }

    /// See [`Transformer::handle_missing_values`]. Adds the handled cells
    /// to `missing_values_handled`.
    pub fn handle_missing_values(
        &mut self,
        strategy: MissingStrategy,
        fill_value: Option<&Value>,
    ) -> Result<&mut Self> {
        let table = require(&mut self.table, "handle_missing_values")?;
        let handled = self
            .transformer
            .handle_missing_values(table, strategy, fill_value)?;
        self.stats.missing_values_handled += handled;
        self.stats.transformations_applied += 1;
        Ok(self)
    }

    /// See [`Transformer::rename_columns`].
    pub fn rename_columns(&mut self, mapping: &[(&str, &str)]) -> Result<&mut Self> {
        let table = require(&mut self.table, "rename_columns")?;
        self.transformer.rename_columns(table, mapping)?;
        self.stats.transformations_applied += 1;
        Ok(self)
    }

    /// See [`Transformer::select_columns`].
    pub fn select_columns(&mut self, names: &[&str]) -> Result<&mut Self> {
        let table = require(&mut self.table, "select_columns")?;
        self.transformer.select_columns(table, names)?;
        self.stats.transformations_applied += 1;
        Ok(self)
    }

    /// See [`Transformer::filter_rows`].
    pub fn filter_rows<F>(&mut self, predicate: F) -> Result<&mut Self>
    where
        F: Fn(&Row<'_>) -> bool,
    {
        let table = require(&mut self.table, "filter_rows")?;
        self.transformer.filter_rows(table, predicate)?;
        self.stats.transformations_applied += 1;
        Ok(self)
    }

    /// See [`Transformer::convert_data_types`].
    pub fn convert_data_types(&mut self, mapping: &[(&str, DataType)]) -> Result<&mut Self> {
        let table = require(&mut self.table, "convert_data_types")?;
        self.transformer.convert_data_types(table, mapping)?;
        self.stats.transformations_applied += 1;
        Ok(self)
    }

    /// See [`Transformer::normalize_column`].
    pub fn normalize_column(&mut self, name: &str, method: NormalizeMethod) -> Result<&mut Self> {
        let table = require(&mut self.table, "normalize_column")?;
        self.transformer.normalize_column(table, name, method)?;
        self.stats.transformations_applied += 1;
        Ok(self)
    }

    /// See [`Transformer::add_calculated_column`].
    pub fn add_calculated_column<F>(&mut self, name: &str, row_fn: F) -> Result<&mut Self>
    where
        F: Fn(&Row<'_>) -> Value,
    {
        let table = require(&mut self.table, "add_calculated_column")?;
        self.transformer.add_calculated_column(table, name, row_fn)?;
        self.stats.transformations_applied += 1;
        Ok(self)
    }

    /// See [`Transformer::aggregate_data`].
    pub fn aggregate_data(
        &mut self,
        group_by: &[&str],
        aggregations: &[(&str, Aggregate)],
    ) -> Result<&mut Self> {
        let table = require(&mut self.table, "aggregate_data")?;
        self.transformer.aggregate_data(table, group_by, aggregations)?;
        self.stats.transformations_applied += 1;
        Ok(self)
    }

    /// Check every row against the schema. The table is not mutated and
    /// `transformations_applied` does not move; the outcome lands in
    /// `valid_records`/`invalid_records` and the stored report.
    pub fn validate(&mut self, schema: &Schema) -> Result<&mut Self> {
        let table = require(&mut self.table, "validate")?;
        let row_count = table.row_count();
        let report = validate_table(table, schema);
        self.stats.valid_records = report.valid_records;
        self.stats.invalid_records = report.invalid_records;
        info!(
            "Validated {} rows: {} valid, {} invalid",
            row_count, report.valid_records, report.invalid_records
        );
        self.last_validation = Some(report);
        Ok(self)
    }

    /// Write the table through the codec. Read-only: neither the table
    /// nor the counters change.
    pub fn load(
        &mut self,
        destination: impl AsRef<Path>,
        format: Option<Format>,
    ) -> Result<&mut Self> {
        let table = require(&mut self.table, "load")?;
        self.codec.load(table, destination.as_ref(), format)?;
        Ok(self)
    }

    /// Mark the run started: status running, `start_time` now.
    pub fn run(&mut self) -> &mut Self {
        self.stats.status = PipelineStatus::Running;
        self.stats.start_time = Some(Utc::now());
        info!("Pipeline started");
        self
    }

    /// Mark the run completed: status completed, `end_time` now, and
    /// `execution_time` set to the given duration or the wall-clock
    /// delta from `start_time`.
    pub fn finish(&mut self, execution_time: Option<f64>) -> &mut Self {
        let end = Utc::now();
        self.stats.end_time = Some(end);
        self.stats.status = PipelineStatus::Completed;
        self.stats.execution_time = execution_time.unwrap_or_else(|| {
            self.stats
                .start_time
                .map(|start| (end - start).num_milliseconds() as f64 / 1000.0)
                .unwrap_or(0.0)
        });
        info!("Pipeline completed in {:.3}s", self.stats.execution_time);
        self
    }

    /// Mark the run failed, for callers abandoning a pipeline after an
    /// unrecovered error.
    pub fn fail(&mut self, reason: &str) -> &mut Self {
        self.stats.status = PipelineStatus::Failed;
        self.stats.end_time = Some(Utc::now());
        error!("Pipeline failed: {}", reason);
        self
    }

    /// Snapshot of the current statistics.
    pub fn get_stats(&self) -> PipelineStats {
        self.stats.clone()
    }

    /// Borrow the current statistics.
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Persist the statistics through the sink. A failure is logged and
    /// returned; the in-memory statistics are untouched either way.
    pub fn save_stats(&self, destination: impl AsRef<Path>) -> Result<()> {
        let destination = destination.as_ref();
        match self.sink.persist(&self.stats, destination) {
            Ok(()) => {
                info!("Saved pipeline stats to '{}'", destination.display());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to persist stats to '{}': {}", destination.display(), e);
                Err(e)
            }
        }
    }

    /// Borrow the current table, if one has been extracted.
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// The report from the most recent `validate` call on the current
    /// table.
    pub fn validation_report(&self) -> Option<&ValidationReport> {
        self.last_validation.as_ref()
    }

    /// Provenance of the most recent extraction, when the codec tracks it.
    pub fn source_info(&self) -> Option<&SourceInfo> {
        self.codec.source_info()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The codec and sink are trait objects without a Debug bound.
        f.debug_struct("Pipeline")
            .field("table", &self.table)
            .field("stats", &self.stats)
            .field("transformer", &self.transformer)
            .field("last_validation", &self.last_validation)
            .finish_non_exhaustive()
    }
}

fn require<'a>(table: &'a mut Option<Table>, operation: &str) -> Result<&'a mut Table> {
    table
        .as_mut()
        .ok_or_else(|| EtlError::NoData(operation.to_string()))
}
