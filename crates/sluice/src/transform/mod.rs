//! Transformation engine: operation policies and the stateless executor.

mod engine;
mod options;

pub use engine::Transformer;
pub use options::{Aggregate, KeepPolicy, MissingStrategy, NormalizeMethod};
