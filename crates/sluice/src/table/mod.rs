//! Tabular data model: typed cell values and the column-oriented table.

mod table;
mod value;

pub use table::{Row, Table};
pub use value::{DataType, Value};

pub(crate) use value::ValueKey;
