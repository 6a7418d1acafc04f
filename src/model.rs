/// Core data types for the world temperature pipeline.
///
/// This module defines the shared domain model imported by all other
/// modules: observations as they come back from the aggregate queries,
/// typed spreadsheet cells, hemisphere-tagged coordinates, the small
/// summary records the jobs report, and the crate error type.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::analysis::AnalysisError;

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// One aggregated data point: a value for a `(group, series)` pair.
///
/// `group` is the row axis (usually a year), `series` the column axis
/// (a city, state or country name). `value` is `None` when the aggregate
/// had nothing to average.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<G, S> {
    pub group: G,
    pub series: S,
    pub value: Option<f64>,
}

impl<G, S> Observation<G, S> {
    pub fn new(group: G, series: S, value: Option<f64>) -> Self {
        Self { group, series, value }
    }
}

/// Observation keyed the way every query in this crate keys them.
pub type YearlyObservation = Observation<i64, String>;

// ---------------------------------------------------------------------------
// Spreadsheet cells
// ---------------------------------------------------------------------------

/// A spreadsheet cell after ingest validation, ready to be bound as a
/// query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Real(f64),
    Null,
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    fn from_suffix(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'N' => Some(Hemisphere::North),
            'S' => Some(Hemisphere::South),
            'E' => Some(Hemisphere::East),
            'W' => Some(Hemisphere::West),
            _ => None,
        }
    }

    pub fn is_latitude(self) -> bool {
        matches!(self, Hemisphere::North | Hemisphere::South)
    }
}

/// A latitude or longitude as stored in the source data: unsigned degrees
/// followed by a hemisphere letter, e.g. `"37.78S"` or `"144.41E"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub degrees: f64,
    pub hemisphere: Hemisphere,
}

impl Coordinate {
    /// Parses `"<degrees><N|S|E|W>"`. Returns `None` for anything else,
    /// including out-of-range degrees for the axis.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let suffix = raw.chars().last()?;
        let hemisphere = Hemisphere::from_suffix(suffix)?;
        let degrees: f64 = raw[..raw.len() - suffix.len_utf8()].trim().parse().ok()?;

        let limit = if hemisphere.is_latitude() { 90.0 } else { 180.0 };
        if !degrees.is_finite() || !(0.0..=limit).contains(&degrees) {
            return None;
        }
        Some(Self { degrees, hemisphere })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self.hemisphere {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
            Hemisphere::East => 'E',
            Hemisphere::West => 'W',
        };
        write!(f, "{:.2}{}", self.degrees, letter)
    }
}

// ---------------------------------------------------------------------------
// Query results and job summaries
// ---------------------------------------------------------------------------

/// A distinct major city with its raw coordinate strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityLocation {
    pub city: String,
    pub country: String,
    pub latitude: String,
    pub longitude: String,
}

/// Minimum, maximum and mean of the monthly averages recorded for one
/// state in one year. All three are `None` when no month had a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateStats {
    pub state: String,
    pub country: String,
    pub year: i32,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
}

/// Tally for loading one spreadsheet into one fact table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub table: String,
    pub rows_read: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that abort a job. Missing data points are never errors; they
/// travel through the pipeline as `None`.
#[derive(Debug, thiserror::Error)]
pub enum TempError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input file not found: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("Database not found: {} (run `create` first)", .0.display())]
    DatabaseMissing(PathBuf),

    #[error("Schema mismatch in {file}: {reason}")]
    SchemaMismatch { file: String, reason: String },

    #[error("Tables already exist (use --force to replace): {}", .0.join(", "))]
    TablesExist(Vec<String>),

    #[error("Database is missing required tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),

    #[error("Sheet '{0}' already exists in the workbook (use --force to replace)")]
    SheetExists(String),

    #[error("No temperature data for {0}")]
    NoData(String),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

pub type Result<T> = std::result::Result<T, TempError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_parses_all_hemispheres() {
        let lat = Coordinate::parse("37.78S").unwrap();
        assert_eq!(lat.hemisphere, Hemisphere::South);
        assert_eq!(lat.degrees, 37.78);

        let lon = Coordinate::parse("144.41E").unwrap();
        assert_eq!(lon.hemisphere, Hemisphere::East);
        assert!(!lon.hemisphere.is_latitude());

        assert_eq!(Coordinate::parse("0.80W").unwrap().hemisphere, Hemisphere::West);
        assert_eq!(Coordinate::parse(" 57.05N ").unwrap().degrees, 57.05);
    }

    #[test]
    fn test_coordinate_rejects_malformed_values() {
        assert!(Coordinate::parse("").is_none());
        assert!(Coordinate::parse("S").is_none());
        assert!(Coordinate::parse("37.78").is_none());
        assert!(Coordinate::parse("37.78X").is_none());
        assert!(Coordinate::parse("95.00N").is_none(), "latitude over 90");
        assert!(Coordinate::parse("181.00E").is_none(), "longitude over 180");
    }

    #[test]
    fn test_coordinate_display_round_trips_source_format() {
        let c = Coordinate::parse("23.31S").unwrap();
        assert_eq!(c.to_string(), "23.31S");
    }

    #[test]
    fn test_error_messages_name_the_problem() {
        let err = TempError::MissingTables(vec!["Country".into(), "State".into()]);
        assert_eq!(err.to_string(), "Database is missing required tables: Country, State");

        let err = TempError::SheetExists("Comparison".into());
        assert!(err.to_string().contains("--force"));
    }
}
