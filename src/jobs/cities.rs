//! Yearly average temperature of every major city in one country.

use serde::Serialize;
use std::path::PathBuf;

use crate::analysis::align;
use crate::export::plot::render_line_chart;
use crate::export::sheet::city_sheet;
use crate::export::{SheetLayout, Workbook};
use crate::jobs::open_existing;
use crate::logging::{self, Stage};
use crate::model::Result;
use crate::verify::require_tables;

#[derive(Debug, Clone)]
pub struct CitiesOptions {
    pub database: PathBuf,
    pub workbook: PathBuf,
    pub country: String,
    pub sheet: String,
    /// Line chart output; `None` skips the chart.
    pub chart: Option<PathBuf>,
    pub precision: Option<usize>,
    /// Replace the sheet if the workbook already has it.
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CitiesReport {
    pub country: String,
    pub cities: Vec<String>,
    pub years: usize,
    pub first_year: Option<i64>,
    pub last_year: Option<i64>,
    pub sheet: String,
    pub chart: Option<String>,
}

pub fn run(opts: &CitiesOptions) -> Result<CitiesReport> {
    let book = Workbook::open(&opts.workbook);

    let store = open_existing(&opts.database)?;
    require_tables(&store)?;
    book.ensure_writable(&opts.sheet, opts.force)?;
    let records = store.yearly_city_averages(&opts.country)?;
    store.close()?;

    if records.is_empty() {
        logging::warn(
            Stage::Store,
            Some(&opts.country),
            "No major city temperatures recorded; the sheet will be empty",
        );
    }

    let aligned = align(&records);
    logging::info(
        Stage::Align,
        Some(&opts.country),
        &format!(
            "{} cities over {} years, {} of {} cells present",
            aligned.column_count(),
            aligned.row_count(),
            aligned.present_count(),
            aligned.row_count() * aligned.column_count()
        ),
    );

    let sheet = city_sheet(&opts.sheet, &aligned);
    let path = book.write_sheet(&sheet, &SheetLayout::new("", opts.precision), opts.force)?;

    let chart = match &opts.chart {
        Some(chart) => {
            let title = format!("Average yearly temperature of major cities in {}", opts.country);
            render_line_chart(&aligned, chart, &title)?;
            Some(chart.display().to_string())
        }
        None => None,
    };

    Ok(CitiesReport {
        country: opts.country.clone(),
        cities: aligned.series().to_vec(),
        years: aligned.row_count(),
        first_year: aligned.groups().next().copied(),
        last_year: aligned.groups().last().copied(),
        sheet: path.display().to_string(),
        chart,
    })
}
