//! Builds the database from the three spreadsheet exports.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::InputFiles;
use crate::db::{load_summary, RecordStore};
use crate::ingest::{read_fact_file, ParsedSheet};
use crate::logging::{self, Stage};
use crate::model::{LoadSummary, Result, TempError};
use crate::tables::FACT_TABLES;

#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub database: PathBuf,
    pub inputs: InputFiles,
    /// Drop and rebuild tables that already exist.
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateReport {
    pub database: String,
    pub replaced: Vec<String>,
    pub tables: Vec<LoadSummary>,
}

/// Reads every input, then (re)creates the tables and loads them.
///
/// Nothing touches the store until all three files have been read, so a
/// missing or malformed input leaves an existing database as it was.
pub fn run(opts: &CreateOptions) -> Result<CreateReport> {
    let sheets = read_inputs(&opts.inputs)?;

    let mut store = RecordStore::open(&opts.database)?;
    let (replaced, tables) = load(&mut store, &sheets, opts.force)?;
    store.close()?;

    Ok(CreateReport {
        database: opts.database.display().to_string(),
        replaced,
        tables,
    })
}

/// Reads the three inputs in registry order.
pub fn read_inputs(inputs: &InputFiles) -> Result<Vec<ParsedSheet>> {
    let mut sheets = Vec::new();
    for table in FACT_TABLES {
        let path = inputs
            .for_table(table.name)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(table.default_file));
        logging::info(
            Stage::Ingest,
            Some(table.name),
            &format!("Reading {} from {}", table.source, path.display()),
        );
        let sheet = read_fact_file(&path, table)?;
        for rejection in &sheet.rejected {
            logging::log_row_rejection(table.name, rejection.line, &rejection.reason);
        }
        sheets.push(sheet);
    }
    Ok(sheets)
}

/// Creates the fact tables in `store` and loads `sheets` into them.
/// Returns the tables that were replaced and a summary per sheet.
///
/// Every existing table counts, derived ones included, so a rebuild never
/// leaves a Southern Cities table pointing at the old data.
pub fn load(store: &mut RecordStore, sheets: &[ParsedSheet], force: bool) -> Result<(Vec<String>, Vec<LoadSummary>)> {
    let existing = store.table_names()?;

    if !existing.is_empty() {
        if !force {
            return Err(TempError::TablesExist(existing));
        }
        logging::warn(
            Stage::Store,
            None,
            &format!("Replacing existing tables: {}", existing.join(", ")),
        );
        store.drop_tables(&existing)?;
    }

    store.create_fact_tables()?;

    let mut summaries = Vec::new();
    for sheet in sheets {
        let counts = store.insert_rows(sheet.table, &sheet.rows)?;
        let summary = load_summary(sheet.table, sheet.rows_read, sheet.rejected.len(), counts);
        logging::log_load_summary(&summary);
        summaries.push(summary);
    }

    store.create_indexes()?;
    logging::info(Stage::Store, None, "Indexes created");

    Ok((existing, summaries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::read_fact_rows;
    use crate::tables::{find_table, COUNTRY_TABLE, MAJOR_CITY_TABLE, STATE_TABLE};

    fn sheets() -> Vec<ParsedSheet> {
        let country = "dt,AverageTemperature,AverageTemperatureUncertainty,Country\n\
                       2000-01-01,21.5,0.2,Australia\n\
                       2000-01-01,22.0,0.2,Australia\n";
        let city = "dt,AverageTemperature,AverageTemperatureUncertainty,City,Country,Latitude,Longitude\n\
                    2000-01-01,25.1,0.3,Sydney,Australia,34.56S,151.78E\n";
        let state = "dt,AverageTemperature,AverageTemperatureUncertainty,State,Country\n\
                     2000-01-01,27.0,0.3,Queensland,Australia\n\
                     not-a-date,27.0,0.3,Queensland,Australia\n";
        vec![
            read_fact_rows(country.as_bytes(), "country", find_table(COUNTRY_TABLE).unwrap()).unwrap(),
            read_fact_rows(city.as_bytes(), "city", find_table(MAJOR_CITY_TABLE).unwrap()).unwrap(),
            read_fact_rows(state.as_bytes(), "state", find_table(STATE_TABLE).unwrap()).unwrap(),
        ]
    }

    #[test]
    fn test_load_counts_duplicates_and_rejections() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let (replaced, summaries) = load(&mut store, &sheets(), false).unwrap();
        assert!(replaced.is_empty());

        assert_eq!(summaries[0].table, "Country");
        assert_eq!((summaries[0].inserted, summaries[0].duplicates), (1, 1));
        assert_eq!(summaries[2].rejected, 1);
        assert_eq!(store.row_count("State").unwrap(), 1);

        // First row wins on a duplicate key.
        let national = store.yearly_country_averages("Australia").unwrap();
        assert_eq!(national[0].value, Some(21.5));
    }

    #[test]
    fn test_existing_tables_need_force() {
        let mut store = RecordStore::open_in_memory().unwrap();
        load(&mut store, &sheets(), false).unwrap();

        match load(&mut store, &sheets(), false) {
            Err(TempError::TablesExist(names)) => assert_eq!(names, vec!["Country", "MajorCity", "State"]),
            other => panic!("expected TablesExist, got {:?}", other),
        }

        let (replaced, _) = load(&mut store, &sheets(), true).unwrap();
        assert_eq!(replaced.len(), 3);
        assert_eq!(store.row_count("Country").unwrap(), 1);
    }

    #[test]
    fn test_force_rebuild_drops_southern_cities() {
        use crate::jobs::southern::{derive, SouthernOptions};
        use crate::tables::SOUTHERN_CITIES_TABLE;

        let mut store = RecordStore::open_in_memory().unwrap();
        load(&mut store, &sheets(), false).unwrap();
        let southern = SouthernOptions {
            database: PathBuf::from(":memory:"),
            state: "Queensland".into(),
            country: "Australia".into(),
            year: 2000,
            force: false,
        };
        derive(&mut store, &southern).unwrap();
        assert_eq!(store.row_count(SOUTHERN_CITIES_TABLE).unwrap(), 1);

        match load(&mut store, &sheets(), false) {
            Err(TempError::TablesExist(names)) => assert!(names.iter().any(|n| n == SOUTHERN_CITIES_TABLE)),
            other => panic!("expected TablesExist, got {:?}", other),
        }

        let (replaced, _) = load(&mut store, &sheets(), true).unwrap();
        assert_eq!(replaced, vec!["Country", "MajorCity", "Southern Cities", "State"]);
        assert!(!store.has_table(SOUTHERN_CITIES_TABLE).unwrap());
        assert_eq!(store.table_names().unwrap(), vec!["Country", "MajorCity", "State"]);
    }

    #[test]
    fn test_missing_input_aborts_before_store() {
        let dir = tempfile::tempdir().unwrap();
        let opts = CreateOptions {
            database: dir.path().join("temps.db"),
            inputs: InputFiles {
                country: dir.path().join("absent.csv"),
                major_city: dir.path().join("absent.csv"),
                state: dir.path().join("absent.csv"),
            },
            force: false,
        };
        assert!(matches!(run(&opts), Err(TempError::InputMissing(_))));
        assert!(!opts.database.exists());
    }
}
