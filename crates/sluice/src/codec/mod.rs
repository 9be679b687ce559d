//! Moving tables between files and memory.

mod file;
mod source;

pub use file::{FileCodec, TableCodec};
pub use source::{Format, SourceInfo};
