//! Southern Hemisphere cities and yearly state statistics.

use serde::Serialize;
use std::path::PathBuf;

use crate::db::RecordStore;
use crate::jobs::open_existing;
use crate::logging::{self, Stage};
use crate::model::{CityLocation, Result, StateStats, TempError};
use crate::tables::SOUTHERN_CITIES_TABLE;
use crate::verify::require_tables;

#[derive(Debug, Clone)]
pub struct SouthernOptions {
    pub database: PathBuf,
    pub state: String,
    pub country: String,
    pub year: i32,
    /// Replace an existing Southern Cities table.
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SouthernReport {
    pub cities: Vec<CityLocation>,
    pub inserted: usize,
    pub duplicates: usize,
    pub replaced_table: bool,
    pub stats: StateStats,
}

pub fn run(opts: &SouthernOptions) -> Result<SouthernReport> {
    let mut store = open_existing(&opts.database)?;
    let report = derive(&mut store, opts)?;
    store.close()?;
    Ok(report)
}

/// Rebuilds the Southern Cities table from `MajorCity` and queries the
/// configured state statistics.
pub fn derive(store: &mut RecordStore, opts: &SouthernOptions) -> Result<SouthernReport> {
    require_tables(store)?;

    let replaced_table = store.has_table(SOUTHERN_CITIES_TABLE)?;
    if replaced_table && !opts.force {
        return Err(TempError::TablesExist(vec![SOUTHERN_CITIES_TABLE.to_string()]));
    }

    let (cities, counts) = store.rebuild_southern_cities()?;
    logging::info(
        Stage::Store,
        Some(SOUTHERN_CITIES_TABLE),
        &format!("{} distinct major cities in the Southern Hemisphere", cities.len()),
    );
    for city in &cities {
        logging::debug(Stage::Store, Some(SOUTHERN_CITIES_TABLE), &format_city(city));
    }
    if counts.duplicates > 0 {
        logging::warn(
            Stage::Store,
            Some(SOUTHERN_CITIES_TABLE),
            &format!("{} cities listed with more than one coordinate pair; kept the first", counts.duplicates),
        );
    }

    let stats = store.state_stats(&opts.state, &opts.country, opts.year)?;
    if stats.avg.is_none() {
        logging::warn(
            Stage::Store,
            Some(&opts.state),
            &format!("No temperatures recorded for {}, {} in {}", opts.state, opts.country, opts.year),
        );
    }

    Ok(SouthernReport {
        cities,
        inserted: counts.inserted,
        duplicates: counts.duplicates,
        replaced_table,
        stats,
    })
}

pub fn format_city(city: &CityLocation) -> String {
    format!("{}, {} ({} {})", city.city, city.country, city.latitude, city.longitude)
}

/// Three-decimal rendering of the statistics block.
pub fn format_stats(stats: &StateStats) -> String {
    let value = |v: Option<f64>| v.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string());
    format!(
        "Temperatures for {}, {} in {}\n    Minimum Temperature: {}\n    Maximum Temperature: {}\n    Average Temperature: {}",
        stats.state,
        stats.country,
        stats.year,
        value(stats.min),
        value(stats.max),
        value(stats.avg)
    )
}
