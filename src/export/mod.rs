/// Output rendering for the query jobs.
///
/// Submodules:
/// - `sheet` — in-memory sheets built from aligned series.
/// - `workbook` — a directory of CSV sheets.
/// - `plot` — SVG charts of aligned and difference series.

pub mod plot;
pub mod sheet;
pub mod workbook;

pub use sheet::{Cell, Orientation, Sheet, SheetLayout};
pub use workbook::Workbook;
