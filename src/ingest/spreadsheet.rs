/// Spreadsheet export reader for the three fact tables.
///
/// Reads a CSV export, checks its header against the registry entry for
/// the target table, and turns each data row into `CellValue`s. Rows that
/// cannot be stored faithfully are rejected with a reason instead of
/// aborting the whole load; a wrong header aborts immediately.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::model::{CellValue, Coordinate, Result, TempError};
use crate::tables::{ColumnKind, FactTable};

// ============================================================================
// Parsed output
// ============================================================================

/// A row that was skipped, with its 1-based line number in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRejection {
    pub line: u64,
    pub reason: String,
}

/// All accepted rows of one spreadsheet, in file order.
#[derive(Debug)]
pub struct ParsedSheet {
    pub table: &'static FactTable,
    pub rows: Vec<Vec<CellValue>>,
    pub rows_read: usize,
    pub rejected: Vec<RowRejection>,
}

// ============================================================================
// Readers
// ============================================================================

/// Reads the spreadsheet export at `path` for `table`.
///
/// Returns `TempError::InputMissing` if the file does not exist, so the
/// caller can abort before touching the store.
pub fn read_fact_file(path: &Path, table: &'static FactTable) -> Result<ParsedSheet> {
    if !path.is_file() {
        return Err(TempError::InputMissing(path.to_path_buf()));
    }
    let file = File::open(path)?;
    read_fact_rows(file, &path.display().to_string(), table)
}

/// Reads a spreadsheet export from any reader. `label` names the source
/// in error messages.
pub fn read_fact_rows<R: Read>(
    reader: R,
    label: &str,
    table: &'static FactTable,
) -> Result<ParsedSheet> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    validate_header(&headers, table, label)?;

    let mut sheet = ParsedSheet {
        table,
        rows: Vec::new(),
        rows_read: 0,
        rejected: Vec::new(),
    };

    for record in csv.records() {
        let record = record?;
        sheet.rows_read += 1;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        match parse_row(&record, table) {
            Ok(row) => sheet.rows.push(row),
            Err(reason) => sheet.rejected.push(RowRejection { line, reason }),
        }
    }

    Ok(sheet)
}

/// Checks that the header names the registry columns, in order.
pub fn validate_header(headers: &StringRecord, table: &FactTable, label: &str) -> Result<()> {
    if headers.len() != table.columns.len() {
        return Err(TempError::SchemaMismatch {
            file: label.to_string(),
            reason: format!(
                "expected {} columns for '{}', found {}",
                table.columns.len(),
                table.name,
                headers.len()
            ),
        });
    }

    for (found, column) in headers.iter().zip(table.columns) {
        let matches = found.eq_ignore_ascii_case(column.name)
            || column.aliases.iter().any(|a| found.eq_ignore_ascii_case(a));
        if !matches {
            return Err(TempError::SchemaMismatch {
                file: label.to_string(),
                reason: format!("expected column '{}', found '{}'", column.name, found),
            });
        }
    }
    Ok(())
}

fn parse_row(record: &StringRecord, table: &FactTable) -> std::result::Result<Vec<CellValue>, String> {
    if record.len() != table.columns.len() {
        return Err(format!(
            "expected {} fields, found {}",
            table.columns.len(),
            record.len()
        ));
    }

    table
        .columns
        .iter()
        .zip(record.iter())
        .map(|(column, raw)| {
            parse_cell(raw, column.kind).map_err(|e| format!("{}: {}", column.name, e))
        })
        .collect()
}

// ============================================================================
// Cell parsing
// ============================================================================

/// Converts one raw cell according to its column kind.
pub fn parse_cell(raw: &str, kind: ColumnKind) -> std::result::Result<CellValue, String> {
    let raw = raw.trim();
    match kind {
        ColumnKind::Date => normalize_date(raw)
            .map(CellValue::Text)
            .ok_or_else(|| format!("invalid date '{}'", raw)),
        ColumnKind::Measure => {
            Ok(parse_measure(raw)?.map(CellValue::Real).unwrap_or(CellValue::Null))
        }
        ColumnKind::Key => {
            if raw.is_empty() {
                Err("empty name".to_string())
            } else {
                Ok(CellValue::Text(raw.to_string()))
            }
        }
        ColumnKind::Latitude | ColumnKind::Longitude => {
            let want_latitude = kind == ColumnKind::Latitude;
            match Coordinate::parse(raw) {
                Some(c) if c.hemisphere.is_latitude() == want_latitude => {
                    Ok(CellValue::Text(raw.to_string()))
                }
                _ => Err(format!("invalid coordinate '{}'", raw)),
            }
        }
    }
}

/// Parses a measurement. Blank cells, `null` and non-finite numbers are
/// missing; anything else that is not a number is an error.
pub fn parse_measure(raw: &str) -> std::result::Result<Option<f64>, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("invalid number '{}'", raw))?;
    Ok(value.is_finite().then_some(value))
}

/// Normalizes a date cell to `YYYY-MM-DD`. Spreadsheet exports sometimes
/// carry a time part (`1743-11-01 00:00:00`); only the date is kept.
pub fn normalize_date(raw: &str) -> Option<String> {
    let date_part = raw.get(..10)?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let rest = &raw[10..];
    if !rest.is_empty() && !rest.starts_with([' ', 'T']) {
        return None;
    }
    Some(date.format("%Y-%m-%d").to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{find_table, COUNTRY_TABLE, MAJOR_CITY_TABLE};

    fn country() -> &'static FactTable {
        find_table(COUNTRY_TABLE).unwrap()
    }

    fn major_city() -> &'static FactTable {
        find_table(MAJOR_CITY_TABLE).unwrap()
    }

    #[test]
    fn test_parse_measure_handles_missing_markers() {
        assert_eq!(parse_measure("12.5"), Ok(Some(12.5)));
        assert_eq!(parse_measure(" -3.25 "), Ok(Some(-3.25)));
        assert_eq!(parse_measure(""), Ok(None));
        assert_eq!(parse_measure("NULL"), Ok(None));
        assert_eq!(parse_measure("NaN"), Ok(None));
        assert_eq!(parse_measure("inf"), Ok(None));
        assert!(parse_measure("warm").is_err());
    }

    #[test]
    fn test_normalize_date_accepts_datetime_suffix() {
        assert_eq!(normalize_date("1743-11-01"), Some("1743-11-01".to_string()));
        assert_eq!(normalize_date("1743-11-01 00:00:00"), Some("1743-11-01".to_string()));
        assert_eq!(normalize_date("2013-09-01T00:00:00"), Some("2013-09-01".to_string()));
        assert_eq!(normalize_date("2013-13-01"), None);
        assert_eq!(normalize_date("01/11/1743"), None);
        assert_eq!(normalize_date("2013-09-01x"), None);
        assert_eq!(normalize_date(""), None);
    }

    #[test]
    fn test_coordinates_must_match_axis() {
        assert_eq!(
            parse_cell("37.78S", ColumnKind::Latitude),
            Ok(CellValue::Text("37.78S".to_string()))
        );
        assert!(parse_cell("144.41E", ColumnKind::Latitude).is_err());
        assert!(parse_cell("37.78S", ColumnKind::Longitude).is_err());
    }

    #[test]
    fn test_reads_rows_with_dt_header_alias() {
        let data = "\
dt,AverageTemperature,AverageTemperatureUncertainty,Country
1900-01-01,25.1,0.4,Australia
1900-02-01,,,Australia
";
        let sheet = read_fact_rows(data.as_bytes(), "inline", country()).unwrap();
        assert_eq!(sheet.rows_read, 2);
        assert!(sheet.rejected.is_empty());
        assert_eq!(sheet.rows[0][1], CellValue::Real(25.1));
        assert_eq!(sheet.rows[1][1], CellValue::Null);
        assert_eq!(sheet.rows[1][3], CellValue::Text("Australia".to_string()));
    }

    #[test]
    fn test_parsed_sheet_debug_names_its_table() {
        let data = "dt,AverageTemperature,AverageTemperatureUncertainty,Country\n1900-01-01,25.1,0.4,Australia\n";
        let sheet = read_fact_rows(data.as_bytes(), "inline", country()).unwrap();
        let debug = format!("{:?}", sheet);
        assert!(debug.contains("name: \"Country\""));
        assert!(debug.contains("rows_read: 1"));
    }

    #[test]
    fn test_bad_rows_are_rejected_with_line_numbers() {
        let data = "\
date,AverageTemperature,AverageTemperatureUncertainty,Country
1900-01-01,25.1,0.4,Australia
not-a-date,25.1,0.4,Australia
1900-03-01,hot,0.4,Australia
1900-04-01,25.1,0.4,
1900-05-01,25.1
";
        let sheet = read_fact_rows(data.as_bytes(), "inline", country()).unwrap();
        assert_eq!(sheet.rows_read, 5);
        assert_eq!(sheet.rows.len(), 1);
        let lines: Vec<u64> = sheet.rejected.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6]);
        assert!(sheet.rejected[0].reason.starts_with("date:"));
        assert!(sheet.rejected[3].reason.contains("expected 4 fields"));
    }

    #[test]
    fn test_wrong_header_is_schema_mismatch() {
        let data = "date,AverageTemperature,AverageTemperatureUncertainty,City\n";
        let err = read_fact_rows(data.as_bytes(), "inline", country()).unwrap_err();
        assert!(matches!(err, TempError::SchemaMismatch { .. }), "{err}");

        let data = "date,AverageTemperature\n";
        let err = read_fact_rows(data.as_bytes(), "inline", country()).unwrap_err();
        assert!(err.to_string().contains("expected 4 columns"));
    }

    #[test]
    fn test_quoted_names_survive_ingest() {
        let data = "\
dt,AverageTemperature,AverageTemperatureUncertainty,City,Country,Latitude,Longitude
1900-01-01,11.0,0.2,\"O'Higgins, \"\"Old\"\"\",Chile,34.56S,70.70W
";
        let sheet = read_fact_rows(data.as_bytes(), "inline", major_city()).unwrap();
        assert_eq!(sheet.rows[0][3], CellValue::Text("O'Higgins, \"Old\"".to_string()));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = read_fact_file(Path::new("/nonexistent/GlobalLandTemperaturesByCountry.csv"), country())
            .unwrap_err();
        assert!(matches!(err, TempError::InputMissing(_)));
    }
}
