//! Embedded SQLite record store.
//!
//! RULE: only this module talks to the database. Jobs call store methods;
//! they never build SQL themselves. Every value reaches SQLite as a bound
//! parameter; table names, which cannot be bound, go through
//! `tables::quote_ident`.

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use std::path::{Path, PathBuf};

use crate::logging::{self, Stage};
use crate::model::{CellValue, CityLocation, LoadSummary, Result, StateStats, YearlyObservation};
use crate::tables::{
    quote_ident, FactTable, COUNTRY_TABLE, FACT_TABLES, MAJOR_CITY_TABLE,
    MEASURE_COLUMN, SOUTHERN_CITIES_TABLE, STATE_TABLE,
};

/// Year expression shared by every aggregate query: the first four
/// characters of the ISO date, as an integer.
const YEAR_EXPR: &str = "CAST(SUBSTR(date, 1, 4) AS INTEGER)";

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

/// Outcome of inserting a batch of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertCounts {
    pub inserted: usize,
    pub duplicates: usize,
}

pub struct RecordStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl RecordStore {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        logging::info(
            Stage::Store,
            None,
            &format!(
                "Connected to '{}' (SQLite {})",
                path.display(),
                rusqlite::version()
            ),
        );
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens an in-memory database (used in tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    /// Database file, `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Closes the connection. Dropping the store also closes it; this
    /// variant surfaces close errors and logs the disconnect.
    pub fn close(self) -> Result<()> {
        let label = self
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string());
        self.conn.close().map_err(|(_, e)| e)?;
        logging::info(Stage::Store, None, &format!("Disconnected from '{}'", label));
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------------

    /// Names of all user tables in the database, ascending. SQLite's own
    /// `sqlite_*` tables are left out.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r"SELECT name FROM sqlite_master
              WHERE type = 'table' AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
              ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    pub fn has_table(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Which of `required` are not present, in the order given.
    pub fn missing_tables(&self, required: &[&str]) -> Result<Vec<String>> {
        let existing = self.table_names()?;
        Ok(required
            .iter()
            .filter(|name| !existing.iter().any(|e| e == *name))
            .map(|name| name.to_string())
            .collect())
    }

    pub fn drop_tables(&mut self, names: &[String]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for name in names {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_ident(name)))?;
            logging::info(Stage::Store, Some(name.as_str()), "Dropped table");
        }
        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Fact tables
    // ------------------------------------------------------------------------

    /// Creates the three fact tables from the registry.
    pub fn create_fact_tables(&self) -> Result<()> {
        for table in FACT_TABLES {
            self.conn.execute_batch(&create_table_sql(table))?;
            logging::info(Stage::Store, Some(table.name), "Table created");
        }
        Ok(())
    }

    /// Indexes the columns the query jobs filter on. Run after loading,
    /// since indexes slow down bulk inserts.
    pub fn create_indexes(&self) -> Result<()> {
        for table in FACT_TABLES {
            for (index, column) in table.indexes {
                self.conn.execute_batch(&format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {}({});",
                    quote_ident(index),
                    quote_ident(table.name),
                    quote_ident(column)
                ))?;
            }
        }
        Ok(())
    }

    /// Inserts validated rows in one transaction. Rows whose primary key
    /// is already present are ignored and counted as duplicates.
    pub fn insert_rows(&mut self, table: &FactTable, rows: &[Vec<CellValue>]) -> Result<InsertCounts> {
        let columns: Vec<String> = table.columns.iter().map(|c| quote_ident(c.name)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
            quote_ident(table.name),
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut counts = InsertCounts::default();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                if stmt.execute(params_from_iter(row.iter()))? == 0 {
                    counts.duplicates += 1;
                } else {
                    counts.inserted += 1;
                }
            }
        }
        tx.commit()?;
        Ok(counts)
    }

    // ------------------------------------------------------------------------
    // Aggregate queries
    // ------------------------------------------------------------------------

    /// Yearly average per major city of `country`.
    pub fn yearly_city_averages(&self, country: &str) -> Result<Vec<YearlyObservation>> {
        let sql = format!(
            "SELECT {YEAR_EXPR} AS year, City, AVG({MEASURE_COLUMN})
             FROM {MAJOR_CITY_TABLE}
             WHERE Country = ?1
             GROUP BY year, City
             ORDER BY year, City"
        );
        self.yearly_observations(&sql, params![country])
    }

    /// Yearly average per state of `country`, optionally for one state.
    pub fn yearly_state_averages(
        &self,
        country: &str,
        state: Option<&str>,
    ) -> Result<Vec<YearlyObservation>> {
        let sql = format!(
            "SELECT {YEAR_EXPR} AS year, State, AVG({MEASURE_COLUMN})
             FROM {STATE_TABLE}
             WHERE Country = ?1 AND (?2 IS NULL OR State = ?2)
             GROUP BY year, State
             ORDER BY year, State"
        );
        self.yearly_observations(&sql, params![country, state])
    }

    /// Yearly national average of `country`.
    pub fn yearly_country_averages(&self, country: &str) -> Result<Vec<YearlyObservation>> {
        let sql = format!(
            "SELECT {YEAR_EXPR} AS year, Country, AVG({MEASURE_COLUMN})
             FROM {COUNTRY_TABLE}
             WHERE Country = ?1
             GROUP BY year, Country
             ORDER BY year"
        );
        self.yearly_observations(&sql, params![country])
    }

    fn yearly_observations(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<YearlyObservation>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok(YearlyObservation {
                    group: row.get(0)?,
                    series: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Distinct state names recorded for `country`, ascending.
    pub fn distinct_states(&self, country: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT State FROM {STATE_TABLE} WHERE Country = ?1 ORDER BY State"
        ))?;
        let states = stmt
            .query_map(params![country], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(states)
    }

    // ------------------------------------------------------------------------
    // Southern Hemisphere cities
    // ------------------------------------------------------------------------

    /// Drops any existing Southern Cities table, recreates it and fills it
    /// with the distinct major cities whose latitude ends in `S`, ordered
    /// by country then city. All of it runs in one transaction. On error the previous
    /// table is left as it was. A city listed twice with different
    /// coordinate strings keeps its first entry.
    pub fn rebuild_southern_cities(&mut self) -> Result<(Vec<CityLocation>, InsertCounts)> {
        let table = quote_ident(SOUTHERN_CITIES_TABLE);
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table}(
                city TEXT,
                country TEXT,
                latitude TEXT NOT NULL,
                longitude TEXT NOT NULL,
                CONSTRAINT southerncities_pk PRIMARY KEY (city, country)
             );"
        ))?;

        let cities = query_southern_cities(&tx)?;
        let mut counts = InsertCounts::default();
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO {table} (city, country, latitude, longitude) VALUES (?1, ?2, ?3, ?4)"
            ))?;
            for c in &cities {
                if stmt.execute(params![c.city, c.country, c.latitude, c.longitude])? == 0 {
                    counts.duplicates += 1;
                } else {
                    counts.inserted += 1;
                }
            }
        }
        tx.commit()?;
        Ok((cities, counts))
    }

    // ------------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------------

    /// Min/max/mean of the monthly averages of one state over one year.
    pub fn state_stats(&self, state: &str, country: &str, year: i32) -> Result<StateStats> {
        let start = format!("{:04}-01-01", year);
        let end = format!("{:04}-12-31", year);
        let (min, max, avg): (Option<f64>, Option<f64>, Option<f64>) = self.conn.query_row(
            &format!(
                "SELECT MIN({MEASURE_COLUMN}), MAX({MEASURE_COLUMN}), AVG({MEASURE_COLUMN})
                 FROM {STATE_TABLE}
                 WHERE State = ?1 AND Country = ?2 AND date BETWEEN ?3 AND ?4"
            ),
            params![state, country, start, end],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(StateStats {
            state: state.to_string(),
            country: country.to_string(),
            year,
            min,
            max,
            avg,
        })
    }

    pub fn row_count(&self, table: &str) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Rows whose averaged temperature is NULL.
    pub fn missing_measurements(&self, table: &str) -> Result<i64> {
        let count = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} IS NULL",
                quote_ident(table),
                MEASURE_COLUMN
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// First and last year recorded in `table`, `None` when it is empty.
    pub fn year_range(&self, table: &str) -> Result<Option<(i64, i64)>> {
        let (first, last): (Option<i64>, Option<i64>) = self.conn.query_row(
            &format!(
                "SELECT MIN({YEAR_EXPR}), MAX({YEAR_EXPR}) FROM {}",
                quote_ident(table)
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(first.zip(last))
    }
}

fn query_southern_cities(conn: &Connection) -> Result<Vec<CityLocation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT City, Country, Latitude, Longitude
         FROM {MAJOR_CITY_TABLE}
         WHERE Latitude LIKE '%S'
         ORDER BY Country, City"
    ))?;
    let cities = stmt
        .query_map([], |row| {
            Ok(CityLocation {
                city: row.get(0)?,
                country: row.get(1)?,
                latitude: row.get(2)?,
                longitude: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(cities)
}

/// `CREATE TABLE` statement for a registry entry.
pub fn create_table_sql(table: &FactTable) -> String {
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("    {} {}", quote_ident(c.name), c.kind.sql_type()))
        .collect();
    let key: Vec<String> = table.primary_key.iter().map(|k| quote_ident(k)).collect();
    lines.push(format!(
        "    CONSTRAINT {} PRIMARY KEY ({})",
        quote_ident(&format!("{}_pk", table.name.to_lowercase())),
        key.join(", ")
    ));
    format!("CREATE TABLE {}(\n{}\n);", quote_ident(table.name), lines.join(",\n"))
}

/// Load summary for one sheet, combining ingest and insert tallies.
pub fn load_summary(table: &FactTable, rows_read: usize, rejected: usize, counts: InsertCounts) -> LoadSummary {
    LoadSummary {
        table: table.name.to_string(),
        rows_read,
        inserted: counts.inserted,
        duplicates: counts.duplicates,
        rejected,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
