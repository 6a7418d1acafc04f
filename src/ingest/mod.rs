/// Spreadsheet ingest.
///
/// The source workbooks each hold a single sheet; they are consumed as
/// CSV exports of that sheet. Every row is validated against the table
/// registry and converted into typed cells before the store sees it.
///
/// Submodules:
/// - `spreadsheet` — header validation, cell parsing, row rejection.

pub mod spreadsheet;

pub use spreadsheet::{read_fact_file, read_fact_rows, ParsedSheet, RowRejection};
