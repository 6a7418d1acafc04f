/// World land temperature records: load the spreadsheet exports into a
/// local SQLite database, align yearly averages into dense tables, and
/// write them back out as sheets and charts.

pub mod analysis;
pub mod config;
pub mod db;
pub mod export;
pub mod ingest;
pub mod jobs;
pub mod logging;
pub mod model;
pub mod tables;
pub mod verify;
