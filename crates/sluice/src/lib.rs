//! Sluice: a chainable ETL pipeline library for tabular datasets.
//!
//! A [`Pipeline`] owns one in-memory [`Table`] and runs named
//! transformation steps over it, while [`PipelineStats`] records what
//! every step did and rows can be checked against a declarative
//! [`Schema`].
//!
//! # Core Principles
//!
//! - **Chainable**: transformation calls return the pipeline, so a whole
//!   run reads as one expression
//! - **Accountable**: cumulative statistics track rows in, duplicates
//!   removed, missing values handled, and the run lifecycle
//! - **Atomic steps**: a failing operation returns an error and leaves
//!   the table exactly as it was
//!
//! # Example
//!
//! ```no_run
//! use sluice::{KeepPolicy, Pipeline};
//!
//! let mut pipeline = Pipeline::new();
//! pipeline.run();
//! pipeline
//!     .extract("users.csv", None).unwrap()
//!     .remove_duplicates(None, KeepPolicy::First).unwrap()
//!     .load("users_clean.json", None).unwrap();
//! pipeline.finish(None);
//!
//! println!("Removed {} duplicates", pipeline.stats().duplicates_removed);
//! ```

pub mod codec;
pub mod error;
pub mod stats;
pub mod table;
pub mod transform;
pub mod validation;

mod pipeline;

pub use codec::{FileCodec, Format, SourceInfo, TableCodec};
pub use error::{EtlError, Result};
pub use pipeline::Pipeline;
pub use stats::{JsonStatsSink, PipelineStats, PipelineStatus, StatsSink};
pub use table::{DataType, Row, Table, Value};
pub use transform::{Aggregate, KeepPolicy, MissingStrategy, NormalizeMethod, Transformer};
pub use validation::{FieldRule, RowErrors, Schema, ValidationReport, ValidationResult};
