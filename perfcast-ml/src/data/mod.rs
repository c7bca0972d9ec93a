//! Raw tabular data: feature tables, cell typing and per-period sources.

pub mod schema;
pub mod source;
pub mod table;

pub use schema::{ColumnKind, infer_column_kind, parse_cell};
pub use source::{CsvSource, DatasetAssembler, FilesByPeriod, PerformanceRecord};
pub use table::{FeatureMatrix, FeatureTable, Record};
