use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use world_temp::config::Config;
use world_temp::jobs::cities::{self, CitiesOptions};
use world_temp::jobs::comparison::{self, ComparisonOptions};
use world_temp::jobs::create::{self, CreateOptions};
use world_temp::jobs::southern::{self, SouthernOptions};
use world_temp::jobs::open_existing;
use world_temp::logging::{self, init_logger, LogLevel, Stage};
use world_temp::verify::{format_report, verify_database};

#[derive(Parser, Debug)]
#[command(author, version, about = "World land temperature database and reports", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $WORLD_TEMP_CONFIG or ./world_temp.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimum log level: debug, info, warn or error
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also append log events to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Prefix console log lines with timestamps
    #[arg(long, global = true)]
    timestamps: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the three spreadsheet exports into a new database
    Create(CreateArgs),
    /// Build the Southern Cities table and print state statistics
    Southern(SouthernArgs),
    /// Yearly average temperature of a country's major cities
    Cities(CitiesArgs),
    /// State yearly averages compared with the national average
    Comparison(ComparisonArgs),
    /// Report which tables exist and what they hold
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Drop and rebuild tables that already exist
    #[arg(long)]
    force: bool,
    /// Country spreadsheet export
    #[arg(long)]
    country_file: Option<PathBuf>,
    /// Major city spreadsheet export
    #[arg(long)]
    city_file: Option<PathBuf>,
    /// State spreadsheet export
    #[arg(long)]
    state_file: Option<PathBuf>,
    /// Write the job report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SouthernArgs {
    /// Replace an existing Southern Cities table
    #[arg(long)]
    force: bool,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    /// Write the job report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CitiesArgs {
    /// Replace the sheet if it exists
    #[arg(long)]
    force: bool,
    #[arg(long)]
    country: Option<String>,
    /// Skip the line chart
    #[arg(long)]
    no_plot: bool,
    /// Write the job report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ComparisonArgs {
    /// Replace the sheet if it exists
    #[arg(long)]
    force: bool,
    #[arg(long)]
    country: Option<String>,
    /// Skip the difference plot
    #[arg(long)]
    no_plot: bool,
    /// Write the job report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(level) = LogLevel::parse(&cli.log_level) else {
        bail!("unknown log level '{}'", cli.log_level);
    };
    init_logger(level, cli.log_file.as_deref(), cli.timestamps)
        .with_context(|| format!("failed to open log file {:?}", cli.log_file))?;

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    logging::debug(Stage::System, None, &format!("{:?}", config));

    match cli.command {
        Command::Create(args) => handle_create(&config, args),
        Command::Southern(args) => handle_southern(&config, args),
        Command::Cities(args) => handle_cities(&config, args),
        Command::Comparison(args) => handle_comparison(&config, args),
        Command::Verify(args) => handle_verify(&config, args),
    }
}

fn handle_create(config: &Config, args: CreateArgs) -> Result<()> {
    let mut inputs = config.inputs.clone();
    if let Some(path) = args.country_file {
        inputs.country = path;
    }
    if let Some(path) = args.city_file {
        inputs.major_city = path;
    }
    if let Some(path) = args.state_file {
        inputs.state = path;
    }

    let report = create::run(&CreateOptions {
        database: config.database.clone(),
        inputs,
        force: args.force,
    })
    .context("create job failed")?;

    for table in &report.tables {
        println!(
            "{:<10} {} rows read, {} inserted, {} duplicates, {} rejected",
            table.table, table.rows_read, table.inserted, table.duplicates, table.rejected
        );
    }
    write_report(args.report.as_deref(), &report)
}

fn handle_southern(config: &Config, args: SouthernArgs) -> Result<()> {
    let report = southern::run(&SouthernOptions {
        database: config.database.clone(),
        state: args.state.unwrap_or_else(|| config.southern.state.clone()),
        country: args.country.unwrap_or_else(|| config.southern.country.clone()),
        year: args.year.unwrap_or(config.southern.year),
        force: args.force,
    })
    .context("southern job failed")?;

    println!("Major cities in the Southern Hemisphere:");
    for city in &report.cities {
        println!("    {}", southern::format_city(city));
    }
    println!();
    println!("{}", southern::format_stats(&report.stats));
    write_report(args.report.as_deref(), &report)
}

fn handle_cities(config: &Config, args: CitiesArgs) -> Result<()> {
    let report = cities::run(&CitiesOptions {
        database: config.database.clone(),
        workbook: config.workbook.clone(),
        country: args.country.unwrap_or_else(|| config.cities.country.clone()),
        sheet: config.cities.sheet.clone(),
        chart: if args.no_plot { None } else { config.cities.chart.clone() },
        precision: config.export.precision,
        force: args.force,
    })
    .context("cities job failed")?;

    println!(
        "{} cities over {} years written to {}",
        report.cities.len(),
        report.years,
        report.sheet
    );
    write_report(args.report.as_deref(), &report)
}

fn handle_comparison(config: &Config, args: ComparisonArgs) -> Result<()> {
    let report = comparison::run(&ComparisonOptions {
        database: config.database.clone(),
        workbook: config.workbook.clone(),
        country: args.country.unwrap_or_else(|| config.comparison.country.clone()),
        sheet: config.comparison.sheet.clone(),
        plot: if args.no_plot { None } else { config.comparison.plot.clone() },
        precision: config.export.precision,
        force: args.force,
    })
    .context("comparison job failed")?;

    println!(
        "{} states over {} years written to {}",
        report.states.len(),
        report.years,
        report.sheet
    );
    write_report(args.report.as_deref(), &report)
}

fn handle_verify(config: &Config, args: VerifyArgs) -> Result<()> {
    let store = open_existing(&config.database)?;
    let report = verify_database(&store)?;
    store.close()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }
    Ok(())
}

fn write_report<T: Serialize>(path: Option<&Path>, report: &T) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("failed to write report to {}", path.display()))?;
    logging::info(Stage::System, None, &format!("Report written to {}", path.display()));
    Ok(())
}
