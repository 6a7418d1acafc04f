//! Sheets built from aligned series.
//!
//! A sheet is a list of rows of typed cells. Layout decisions (which axis
//! runs down the page, where titles and blank separator rows go) happen
//! here; how a cell is spelled on disk is decided by [`SheetLayout`].

use std::io::Write;

use crate::analysis::AlignedSeries;
use crate::model::Result;

pub const YEAR_HEADER: &str = "Year";
pub const STATE_BLOCK_TITLE: &str = "Individual State Temperature Data";
pub const DIFFERENCE_BLOCK_TITLE: &str = "Difference Between State and National Average Temperature";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Label(String),
    Integer(i64),
    Number(f64),
    /// A cell inside a data block with no value.
    Missing,
    /// Padding outside any data block.
    Blank,
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Missing)
    }
}

/// Converts a group or series key into a cell.
pub trait ToCell {
    fn to_cell(&self) -> Cell;
}

impl ToCell for i64 {
    fn to_cell(&self) -> Cell {
        Cell::Integer(*self)
    }
}

impl ToCell for i32 {
    fn to_cell(&self) -> Cell {
        Cell::Integer(i64::from(*self))
    }
}

impl ToCell for String {
    fn to_cell(&self) -> Cell {
        Cell::Label(self.clone())
    }
}

/// Which key runs down the first column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// One row per group key (year), one column per series.
    GroupRows,
    /// One row per series, one column per group key (year).
    SeriesRows,
}

/// How cells are spelled when written out.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub missing_marker: String,
    /// Decimal places for numbers; `None` keeps full precision.
    pub precision: Option<usize>,
}

impl SheetLayout {
    pub fn new(missing_marker: &str, precision: Option<usize>) -> Self {
        Self {
            missing_marker: missing_marker.to_string(),
            precision,
        }
    }

    pub fn render(&self, cell: &Cell) -> String {
        match cell {
            Cell::Label(s) => s.clone(),
            Cell::Integer(v) => v.to_string(),
            Cell::Number(v) => match self.precision {
                Some(p) => format!("{:.*}", p, v),
                None => v.to_string(),
            },
            Cell::Missing => self.missing_marker.clone(),
            Cell::Blank => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn push_blank(&mut self) {
        self.rows.push(vec![Cell::Blank]);
    }

    pub fn push_title(&mut self, title: &str) {
        self.rows.push(vec![Cell::Label(title.to_string())]);
    }

    pub fn extend_rows<I: IntoIterator<Item = Vec<Cell>>>(&mut self, rows: I) {
        self.rows.extend(rows);
    }

    /// Header row naming the columns of `aligned` in `orientation`.
    pub fn push_header<G, S>(&mut self, aligned: &AlignedSeries<G, S>, orientation: Orientation)
    where
        G: Ord + Clone + ToCell,
        S: Ord + Clone + ToCell,
    {
        let mut header = vec![Cell::Label(YEAR_HEADER.to_string())];
        match orientation {
            Orientation::GroupRows => header.extend(aligned.series().iter().map(ToCell::to_cell)),
            Orientation::SeriesRows => header.extend(aligned.groups().map(ToCell::to_cell)),
        }
        self.rows.push(header);
    }

    /// Data rows of `aligned`, without a header.
    pub fn push_data<G, S>(&mut self, aligned: &AlignedSeries<G, S>, orientation: Orientation)
    where
        G: Ord + Clone + ToCell,
        S: Ord + Clone + ToCell,
    {
        match orientation {
            Orientation::GroupRows => {
                for (group, values) in aligned.rows() {
                    let mut row = vec![group.to_cell()];
                    row.extend(values.iter().map(|v| Cell::from(*v)));
                    self.rows.push(row);
                }
            }
            Orientation::SeriesRows => {
                for series in aligned.series() {
                    let mut row = vec![series.to_cell()];
                    if let Some(column) = aligned.column(series) {
                        row.extend(column.into_iter().map(Cell::from));
                    }
                    self.rows.push(row);
                }
            }
        }
    }

    pub fn render(&self, layout: &SheetLayout) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| layout.render(c)).collect())
            .collect()
    }

    /// Writes the sheet as CSV. Rows keep their own lengths.
    pub fn write_csv<W: Write>(&self, writer: W, layout: &SheetLayout) -> Result<()> {
        let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        for row in self.render(layout) {
            csv.write_record(&row)?;
        }
        csv.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Job layouts
// ---------------------------------------------------------------------------

/// Header row followed by the data rows of `aligned`.
pub fn aligned_block<G, S>(aligned: &AlignedSeries<G, S>, orientation: Orientation) -> Vec<Vec<Cell>>
where
    G: Ord + Clone + ToCell,
    S: Ord + Clone + ToCell,
{
    let mut block = Sheet::new("");
    block.push_header(aligned, orientation);
    block.push_data(aligned, orientation);
    block.rows
}

/// Years down the first column, one column per city.
pub fn city_sheet(name: &str, cities: &AlignedSeries<i64, String>) -> Sheet {
    let mut sheet = Sheet::new(name);
    sheet.extend_rows(aligned_block(cities, Orientation::GroupRows));
    sheet
}

/// Years across the header; national row, then the state block, then the
/// difference block, all over the same year columns. The state block
/// closes with the national row again so every series is listed together.
pub fn comparison_sheet(
    name: &str,
    national: &AlignedSeries<i64, String>,
    states: &AlignedSeries<i64, String>,
    differences: &AlignedSeries<i64, String>,
) -> Sheet {
    let mut sheet = Sheet::new(name);
    sheet.push_header(national, Orientation::SeriesRows);
    sheet.push_data(national, Orientation::SeriesRows);
    sheet.push_blank();
    sheet.push_title(STATE_BLOCK_TITLE);
    sheet.push_data(states, Orientation::SeriesRows);
    sheet.push_data(national, Orientation::SeriesRows);
    sheet.push_blank();
    sheet.push_title(DIFFERENCE_BLOCK_TITLE);
    sheet.push_data(differences, Orientation::SeriesRows);
    sheet
}
