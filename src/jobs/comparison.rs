//! Per-state yearly averages against the national average.

use serde::Serialize;
use std::path::PathBuf;

use crate::analysis::{align_all, difference};
use crate::export::plot::render_difference_scatter;
use crate::export::sheet::comparison_sheet;
use crate::export::{SheetLayout, Workbook};
use crate::jobs::open_existing;
use crate::logging::{self, Stage};
use crate::model::{Result, TempError};
use crate::verify::require_tables;

/// Written into year columns a state or the nation has no value for.
pub const MISSING_MARKER: &str = "-";

#[derive(Debug, Clone)]
pub struct ComparisonOptions {
    pub database: PathBuf,
    pub workbook: PathBuf,
    pub country: String,
    pub sheet: String,
    /// Difference scatter plot output; `None` skips the plot.
    pub plot: Option<PathBuf>,
    pub precision: Option<usize>,
    /// Replace the sheet if the workbook already has it.
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub country: String,
    pub states: Vec<String>,
    pub years: usize,
    pub first_year: Option<i64>,
    pub last_year: Option<i64>,
    /// State-years with both a state and a national value.
    pub differences: usize,
    pub sheet: String,
    pub plot: Option<String>,
}

pub fn run(opts: &ComparisonOptions) -> Result<ComparisonReport> {
    let book = Workbook::open(&opts.workbook);

    let store = open_existing(&opts.database)?;
    require_tables(&store)?;
    book.ensure_writable(&opts.sheet, opts.force)?;

    let states = store.distinct_states(&opts.country)?;
    let mut state_records = Vec::new();
    for state in &states {
        state_records.extend(store.yearly_state_averages(&opts.country, Some(state.as_str()))?);
    }
    let national_records = store.yearly_country_averages(&opts.country)?;
    store.close()?;

    if national_records.is_empty() {
        return Err(TempError::NoData(opts.country.clone()));
    }
    if states.is_empty() {
        logging::warn(Stage::Store, Some(&opts.country), "No states recorded");
    }

    let aligned = align_all(&[state_records, national_records]);
    let (by_state, national) = (&aligned[0], &aligned[1]);
    logging::info(
        Stage::Align,
        Some(&opts.country),
        &format!(
            "{} states over {} shared years",
            by_state.column_count(),
            national.row_count()
        ),
    );

    let diff = difference(by_state, national)?;

    let plot = match &opts.plot {
        Some(path) => {
            let title = format!("Difference between state and {} average temperature", opts.country);
            render_difference_scatter(&diff, path, &title)?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let sheet = comparison_sheet(&opts.sheet, national, by_state, &diff);
    let path = book.write_sheet(
        &sheet,
        &SheetLayout::new(MISSING_MARKER, opts.precision),
        opts.force,
    )?;

    Ok(ComparisonReport {
        country: opts.country.clone(),
        states: by_state.series().to_vec(),
        years: national.row_count(),
        first_year: national.groups().next().copied(),
        last_year: national.groups().last().copied(),
        differences: diff.present_count(),
        sheet: path.display().to_string(),
        plot,
    })
}
