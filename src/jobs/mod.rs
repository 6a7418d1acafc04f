/// The batch jobs behind the CLI subcommands.
///
/// Each job is a straight sequence: open the store, check it, query,
/// close, then transform and write. The store is closed before any output
/// is produced, and every early return drops it.
///
/// Submodules:
/// - `create` — load the three spreadsheet exports into a fresh store.
/// - `southern` — derive the Southern Cities table, report state statistics.
/// - `cities` — yearly per-city averages as a sheet and line chart.
/// - `comparison` — states against the national average, with differences.

pub mod cities;
pub mod comparison;
pub mod create;
pub mod southern;

use std::path::Path;

use crate::db::RecordStore;
use crate::model::{Result, TempError};

/// Opens a database the query jobs read from. Unlike `RecordStore::open`
/// this never creates the file.
pub fn open_existing(path: &Path) -> Result<RecordStore> {
    if !path.is_file() {
        return Err(TempError::DatabaseMissing(path.to_path_buf()));
    }
    RecordStore::open(path)
}
