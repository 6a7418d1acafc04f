//! Database Verification Module
//!
//! Checks the record store before a job touches it, and reports what each
//! fact table holds: whether it exists, how many rows it has, how many of
//! those lack a temperature, and which years it covers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::RecordStore;
use crate::logging::{self, Stage};
use crate::model::{Result, TempError};
use crate::tables::{required_table_names, SOUTHERN_CITIES_TABLE};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub database: Option<String>,
    pub tables: Vec<TableVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub tables_total: usize,
    pub tables_present: usize,
    pub tables_empty: usize,
    pub tables_missing: usize,
    pub total_rows: i64,
    /// Whether every required table exists and holds rows.
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableVerification {
    pub name: String,
    pub required: bool,
    pub status: VerificationStatus,
    pub row_count: i64,
    pub missing_measurements: i64,
    pub first_year: Option<i64>,
    pub last_year: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerificationStatus {
    Present,
    Empty,
    Missing,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationStatus::Present => write!(f, "present"),
            VerificationStatus::Empty => write!(f, "empty"),
            VerificationStatus::Missing => write!(f, "missing"),
        }
    }
}

// ============================================================================
// Pre-job check
// ============================================================================

/// Fails with `MissingTables` unless all three fact tables exist.
pub fn require_tables(store: &RecordStore) -> Result<()> {
    let missing = store.missing_tables(&required_table_names())?;
    if missing.is_empty() {
        return Ok(());
    }
    logging::error(
        Stage::Store,
        None,
        &format!("Missing required tables: {}", missing.join(", ")),
    );
    Err(TempError::MissingTables(missing))
}

// ============================================================================
// Full report
// ============================================================================

/// Verifies the three fact tables and, when present, the derived
/// Southern Cities table.
pub fn verify_database(store: &RecordStore) -> Result<VerificationReport> {
    let mut tables = Vec::new();
    for name in required_table_names() {
        tables.push(verify_fact_table(store, name)?);
    }
    if store.has_table(SOUTHERN_CITIES_TABLE)? {
        let row_count = store.row_count(SOUTHERN_CITIES_TABLE)?;
        tables.push(TableVerification {
            name: SOUTHERN_CITIES_TABLE.to_string(),
            required: false,
            status: status_for(true, row_count),
            row_count,
            missing_measurements: 0,
            first_year: None,
            last_year: None,
        });
    }

    for table in &tables {
        let message = format!("{}: {} rows", table.status, table.row_count);
        match table.status {
            VerificationStatus::Present => logging::info(Stage::Store, Some(&table.name), &message),
            _ => logging::warn(Stage::Store, Some(&table.name), &message),
        }
    }

    let summary = summarize(&tables);
    Ok(VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        database: store.path().map(|p| p.display().to_string()),
        tables,
        summary,
    })
}

fn verify_fact_table(store: &RecordStore, name: &str) -> Result<TableVerification> {
    if !store.has_table(name)? {
        return Ok(TableVerification {
            name: name.to_string(),
            required: true,
            status: VerificationStatus::Missing,
            row_count: 0,
            missing_measurements: 0,
            first_year: None,
            last_year: None,
        });
    }

    let row_count = store.row_count(name)?;
    let range = store.year_range(name)?;
    Ok(TableVerification {
        name: name.to_string(),
        required: true,
        status: status_for(true, row_count),
        row_count,
        missing_measurements: store.missing_measurements(name)?,
        first_year: range.map(|(first, _)| first),
        last_year: range.map(|(_, last)| last),
    })
}

fn status_for(exists: bool, row_count: i64) -> VerificationStatus {
    match (exists, row_count) {
        (false, _) => VerificationStatus::Missing,
        (true, 0) => VerificationStatus::Empty,
        (true, _) => VerificationStatus::Present,
    }
}

fn summarize(tables: &[TableVerification]) -> VerificationSummary {
    let count = |status| tables.iter().filter(|t| t.status == status).count();
    VerificationSummary {
        tables_total: tables.len(),
        tables_present: count(VerificationStatus::Present),
        tables_empty: count(VerificationStatus::Empty),
        tables_missing: count(VerificationStatus::Missing),
        total_rows: tables.iter().map(|t| t.row_count).sum(),
        ready: tables
            .iter()
            .filter(|t| t.required)
            .all(|t| t.status == VerificationStatus::Present),
    }
}

/// Plain-text rendering of a report, one line per table.
pub fn format_report(report: &VerificationReport) -> String {
    let mut out = String::new();
    if let Some(db) = &report.database {
        out.push_str(&format!("Database: {}\n", db));
    }
    for t in &report.tables {
        let years = match (t.first_year, t.last_year) {
            (Some(first), Some(last)) => format!("{}-{}", first, last),
            _ => "-".to_string(),
        };
        out.push_str(&format!(
            "{:<16} {:<8} rows={:<10} missing={:<8} years={}\n",
            t.name, t.status, t.row_count, t.missing_measurements, years
        ));
    }
    out.push_str(&format!(
        "{}/{} tables present, {} empty, {} missing, {} rows{}\n",
        report.summary.tables_present,
        report.summary.tables_total,
        report.summary.tables_empty,
        report.summary.tables_missing,
        report.summary.total_rows,
        if report.summary.ready { "" } else { " (not ready)" }
    ));
    out
}
