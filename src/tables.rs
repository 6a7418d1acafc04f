/// Fact table registry for the world temperature store.
///
/// Defines the three fixed fact tables loaded from the spreadsheet
/// exports, plus the derived "Southern Cities" table. This is the single
/// source of truth for table and column names: the store, the ingest
/// layer and the verification report read their schema from here instead
/// of hardcoding column lists.

// ---------------------------------------------------------------------------
// Column metadata
// ---------------------------------------------------------------------------

/// How a spreadsheet cell in a column is validated and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// ISO date, `YYYY-MM-DD`. Stored as text so `SUBSTR` yields the year.
    Date,
    /// Floating point measurement; may be missing.
    Measure,
    /// Non-empty name (city, state, country).
    Key,
    /// Latitude string with trailing `N`/`S`.
    Latitude,
    /// Longitude string with trailing `E`/`W`.
    Longitude,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Measure => "REAL",
            ColumnKind::Date | ColumnKind::Key | ColumnKind::Latitude | ColumnKind::Longitude => {
                "TEXT"
            }
        }
    }
}

#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Alternative header spellings accepted by the ingest layer.
    pub aliases: &'static [&'static str],
}

/// Metadata for one fact table.
#[derive(Debug)]
pub struct FactTable {
    /// Table name in the store.
    pub name: &'static str,
    /// Human-readable label of the spreadsheet the table is loaded from.
    pub source: &'static str,
    /// Default input file name.
    pub default_file: &'static str,
    /// Columns in spreadsheet order.
    pub columns: &'static [Column],
    pub primary_key: &'static [&'static str],
    /// `(index name, column)` pairs, created after loading.
    pub indexes: &'static [(&'static str, &'static str)],
}

impl FactTable {
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(column))
    }

    /// The first measure column; every fact table has exactly one
    /// averaged temperature column.
    pub fn measure_column(&self) -> &'static str {
        self.columns
            .iter()
            .find(|c| c.kind == ColumnKind::Measure)
            .map(|c| c.name)
            .unwrap_or(MEASURE_COLUMN)
    }
}

pub const DATE_COLUMN: &str = "date";
pub const MEASURE_COLUMN: &str = "AverageTemperature";
pub const UNCERTAINTY_COLUMN: &str = "AverageTemperatureUncertainty";

pub const COUNTRY_TABLE: &str = "Country";
pub const MAJOR_CITY_TABLE: &str = "MajorCity";
pub const STATE_TABLE: &str = "State";
pub const SOUTHERN_CITIES_TABLE: &str = "Southern Cities";

const DATE: Column = Column { name: DATE_COLUMN, kind: ColumnKind::Date, aliases: &["dt"] };
const AVG: Column = Column { name: MEASURE_COLUMN, kind: ColumnKind::Measure, aliases: &[] };
const UNCERTAINTY: Column = Column {
    name: UNCERTAINTY_COLUMN,
    kind: ColumnKind::Measure,
    aliases: &[],
};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The three fact tables, in load order.
pub static FACT_TABLES: &[FactTable] = &[
    FactTable {
        name: COUNTRY_TABLE,
        source: "GlobalLandTemperaturesByCountry",
        default_file: "GlobalLandTemperaturesByCountry.csv",
        columns: &[
            DATE,
            AVG,
            UNCERTAINTY,
            Column { name: "Country", kind: ColumnKind::Key, aliases: &[] },
        ],
        primary_key: &[DATE_COLUMN, "Country"],
        indexes: &[("i_country_country", "Country")],
    },
    FactTable {
        name: MAJOR_CITY_TABLE,
        source: "GlobalLandTemperaturesByMajorCity",
        default_file: "GlobalLandTemperaturesByMajorCity.csv",
        columns: &[
            DATE,
            AVG,
            UNCERTAINTY,
            Column { name: "City", kind: ColumnKind::Key, aliases: &[] },
            Column { name: "Country", kind: ColumnKind::Key, aliases: &[] },
            Column { name: "Latitude", kind: ColumnKind::Latitude, aliases: &[] },
            Column { name: "Longitude", kind: ColumnKind::Longitude, aliases: &[] },
        ],
        primary_key: &[DATE_COLUMN, "City", "Country"],
        indexes: &[
            ("i_majorcity_country", "Country"),
            ("i_majorcity_latitude", "Latitude"),
            ("i_majorcity_date", DATE_COLUMN),
        ],
    },
    FactTable {
        name: STATE_TABLE,
        source: "GlobalLandTemperaturesByState",
        default_file: "GlobalLandTemperaturesByState.csv",
        columns: &[
            DATE,
            AVG,
            UNCERTAINTY,
            Column { name: "State", kind: ColumnKind::Key, aliases: &[] },
            Column { name: "Country", kind: ColumnKind::Key, aliases: &[] },
        ],
        primary_key: &[DATE_COLUMN, "State", "Country"],
        indexes: &[
            ("i_state_country", "Country"),
            ("i_state_state", "State"),
            ("i_state_date", DATE_COLUMN),
        ],
    },
];

/// Names of the tables every query job needs.
pub fn required_table_names() -> Vec<&'static str> {
    FACT_TABLES.iter().map(|t| t.name).collect()
}

/// Looks up a fact table by name (case-insensitive). Returns `None` if
/// not found.
pub fn find_table(name: &str) -> Option<&'static FactTable> {
    FACT_TABLES.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

/// Quotes an identifier for SQL, doubling embedded quotes. Table and
/// column names are the only things in this crate that cannot be bound
/// as parameters.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_starts_with_date_and_measures() {
        for table in FACT_TABLES {
            assert_eq!(table.columns[0].kind, ColumnKind::Date, "{}", table.name);
            assert_eq!(table.columns[1].name, MEASURE_COLUMN, "{}", table.name);
            assert_eq!(table.columns[2].name, UNCERTAINTY_COLUMN, "{}", table.name);
            assert_eq!(table.measure_column(), MEASURE_COLUMN);
        }
    }

    #[test]
    fn test_primary_keys_and_indexes_reference_real_columns() {
        for table in FACT_TABLES {
            for key in table.primary_key {
                assert!(
                    table.position(key).is_some(),
                    "primary key column '{}' missing from '{}'",
                    key,
                    table.name
                );
            }
            for (index, column) in table.indexes {
                assert!(
                    table.position(column).is_some(),
                    "index '{}' targets unknown column '{}'",
                    index,
                    column
                );
            }
        }
    }

    #[test]
    fn test_no_duplicate_index_names() {
        let mut seen = std::collections::HashSet::new();
        for table in FACT_TABLES {
            for (index, _) in table.indexes {
                assert!(seen.insert(*index), "duplicate index name '{}'", index);
            }
        }
    }

    #[test]
    fn test_required_tables_match_registry() {
        assert_eq!(required_table_names(), vec!["Country", "MajorCity", "State"]);
    }

    #[test]
    fn test_find_table_is_case_insensitive() {
        assert_eq!(find_table("majorcity").map(|t| t.name), Some(MAJOR_CITY_TABLE));
        assert!(find_table("Province").is_none());
    }

    #[test]
    fn test_only_major_city_carries_coordinates() {
        let city = find_table(MAJOR_CITY_TABLE).unwrap();
        assert_eq!(city.position("Latitude"), Some(5));
        assert_eq!(city.position("Longitude"), Some(6));
        assert!(find_table(STATE_TABLE).unwrap().position("Latitude").is_none());
    }

    #[test]
    fn test_quote_ident_escapes_embedded_quotes() {
        assert_eq!(quote_ident("Southern Cities"), "\"Southern Cities\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
