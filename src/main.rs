//! opsdash - compute operations dashboards from CSV extracts
//!
//! Prints each dashboard's report as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use opsdash::config::AppConfig;
use opsdash::dashboards::{self, DASHBOARDS};
use rayon::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "opsdash")]
#[command(about = "Aggregate manufacturing CSV extracts into dashboard reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List dashboards and the columns each one reads
    List,

    /// Compute one dashboard
    Run {
        /// Dashboard name, see `opsdash list`
        dashboard: String,

        /// CSV extract to read
        #[arg(long)]
        csv: PathBuf,

        /// Filter options as a JSON object
        #[arg(long, conflicts_with = "filters_file")]
        filters: Option<String>,

        /// File holding the filter options JSON
        #[arg(long)]
        filters_file: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Compute every dashboard whose `<name>.csv` exists in the data directory
    RunAll {
        /// Directory of extracts (or set OPSDASH_DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_environment();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::List => list(),
        Command::Run {
            dashboard,
            csv,
            filters,
            filters_file,
            pretty,
        } => {
            let filters = read_filters(filters, filters_file.as_deref())?;
            let output = dashboards::run_csv(&dashboard, &csv, filters)
                .with_context(|| format!("dashboard `{dashboard}` over {}", csv.display()))?;
            print_json(&output, pretty)
        }
        Command::RunAll { data_dir, pretty } => {
            let config = config.with_data_dir(data_dir);
            let outputs = run_all(&config.data_dir)?;
            print_json(&Value::Object(outputs), pretty)
        }
    }
}

fn list() -> Result<()> {
    for info in dashboards::catalog() {
        println!("{}", info.name);
        println!("  required: {}", info.required_columns.join(", "));
        println!("  optional: {}", info.optional_columns.join(", "));
    }
    Ok(())
}

fn read_filters(inline: Option<String>, file: Option<&Path>) -> Result<Value> {
    let text = match (inline, file) {
        (Some(json), _) => json,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading filters from {}", path.display()))?,
        (None, None) => return Ok(Value::Null),
    };
    serde_json::from_str(&text).context("filter options are not valid JSON")
}

/// Dashboards are independent, so they are computed in parallel.
fn run_all(data_dir: &Path) -> Result<serde_json::Map<String, Value>> {
    if !data_dir.is_dir() {
        anyhow::bail!("data directory {} does not exist", data_dir.display());
    }

    let results: Vec<(&str, Option<Value>)> = DASHBOARDS
        .par_iter()
        .map(|name| {
            let path = data_dir.join(dashboards::default_csv(name));
            if !path.is_file() {
                info!(dashboard = *name, path = %path.display(), "no extract, skipped");
                return (*name, None);
            }
            match dashboards::run_csv(name, &path, Value::Null) {
                Ok(output) => (*name, Some(output)),
                Err(e) => {
                    warn!(dashboard = *name, error = %e, "dashboard failed");
                    (*name, None)
                }
            }
        })
        .collect();

    Ok(results
        .into_iter()
        .filter_map(|(name, output)| Some((name.to_string(), output?)))
        .collect())
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}
