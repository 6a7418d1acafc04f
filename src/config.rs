//! Runtime configuration.
//!
//! Read from a TOML file; every value has a default, so an empty or
//! absent file gives the stock setup (China major cities, Australian
//! state comparison, Queensland 2000 statistics). Environment variables,
//! optionally from a `.env` file, override the two paths.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::Result;
use crate::tables::{COUNTRY_TABLE, FACT_TABLES, MAJOR_CITY_TABLE, STATE_TABLE};

pub const CONFIG_ENV: &str = "WORLD_TEMP_CONFIG";
pub const DATABASE_ENV: &str = "WORLD_TEMP_DB";
pub const WORKBOOK_ENV: &str = "WORLD_TEMP_WORKBOOK";
pub const DEFAULT_CONFIG_FILE: &str = "world_temp.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file.
    pub database: PathBuf,
    /// Workbook directory; each sheet is a CSV file inside it.
    pub workbook: PathBuf,
    pub inputs: InputFiles,
    pub cities: CitiesJob,
    pub comparison: ComparisonJob,
    pub southern: SouthernJob,
    pub export: ExportOptions,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputFiles {
    pub country: PathBuf,
    pub major_city: PathBuf,
    pub state: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CitiesJob {
    pub country: String,
    pub sheet: String,
    /// Line chart output; `None` disables it.
    pub chart: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComparisonJob {
    pub country: String,
    pub sheet: String,
    /// Difference scatter plot output; `None` disables it.
    pub plot: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SouthernJob {
    pub state: String,
    pub country: String,
    pub year: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Decimal places written to sheets; `None` writes full precision.
    pub precision: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("Temperature_Data.db"),
            workbook: PathBuf::from("World Temperature"),
            inputs: InputFiles::default(),
            cities: CitiesJob::default(),
            comparison: ComparisonJob::default(),
            southern: SouthernJob::default(),
            export: ExportOptions::default(),
        }
    }
}

impl Default for InputFiles {
    fn default() -> Self {
        let file = |table: &str| {
            FACT_TABLES
                .iter()
                .find(|t| t.name == table)
                .map(|t| PathBuf::from(t.default_file))
                .unwrap_or_default()
        };
        Self {
            country: file(COUNTRY_TABLE),
            major_city: file(MAJOR_CITY_TABLE),
            state: file(STATE_TABLE),
        }
    }
}

impl Default for CitiesJob {
    fn default() -> Self {
        Self {
            country: "China".to_string(),
            sheet: "Temperature by City".to_string(),
            chart: Some(PathBuf::from("city_temperatures.svg")),
        }
    }
}

impl Default for ComparisonJob {
    fn default() -> Self {
        Self {
            country: "Australia".to_string(),
            sheet: "Comparison".to_string(),
            plot: Some(PathBuf::from("state_differences.svg")),
        }
    }
}

impl Default for SouthernJob {
    fn default() -> Self {
        Self {
            state: "Queensland".to_string(),
            country: "Australia".to_string(),
            year: 2000,
        }
    }
}

impl InputFiles {
    /// Input path for a fact table, by table name.
    pub fn for_table(&self, table: &str) -> Option<&Path> {
        match table {
            COUNTRY_TABLE => Some(self.country.as_path()),
            MAJOR_CITY_TABLE => Some(self.major_city.as_path()),
            STATE_TABLE => Some(self.state.as_path()),
            _ => None,
        }
    }
}

impl Config {
    /// Parses a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads configuration for a run.
    ///
    /// Lookup order: `explicit`, then `$WORLD_TEMP_CONFIG`, then
    /// `world_temp.toml` in the working directory, then defaults. Path
    /// overrides from the environment are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.is_file().then_some(default)
            });

        let mut config = match path {
            Some(path) => Self::from_toml(&fs::read_to_string(&path)?)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Applies path overrides. `lookup` resolves an environment key.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(DATABASE_ENV).filter(|v| !v.is_empty()) {
            self.database = PathBuf::from(db);
        }
        if let Some(workbook) = lookup(WORKBOOK_ENV).filter(|v| !v.is_empty()) {
            self.workbook = PathBuf::from(workbook);
        }
    }
}
