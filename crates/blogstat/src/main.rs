//! blogstat - Blog view metrics from the command line
//!
//! # Usage
//!
//! ```bash
//! # Views per month and viewer country
//! blogstat grouped --object country --range month --data data/views.json
//!
//! # Top ten blogs in March, restricted by a filter document
//! blogstat top blog --start 2024-03-01 --end 2024-03-31 \
//!     --filters '{"field": "viewer_country", "eq": "US"}'
//!
//! # Week-over-week growth for one owner, against ClickHouse
//! blogstat --config configs/blogstat.toml growth week --user ann
//!
//! # Show the compiled predicate and its SQL
//! blogstat inspect '{"or": [{"field": "blog", "eq": 1}, {"field": "blog", "eq": 2}]}'
//! ```

mod cmd;

use std::path::Path;

use anyhow::{Context, Result};
use blogstat_config::{Config, LogFormat, LogLevel};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// blogstat - Blog view metrics
#[derive(Parser, Debug)]
#[command(name = "blogstat")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
    /// Log level (trace, debug, info, warn, error) or a raw filter directive. Overrides config file.
    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Blog and view counts per time bucket and viewer country or user
    Grouped(cmd::metrics::GroupedArgs),

    /// Top 10 users, countries or blogs by views
    Top(cmd::metrics::TopArgs),

    /// Views per bucket with growth from the previous bucket
    Growth(cmd::metrics::GrowthArgs),

    /// Compile a filter document and print the predicate and SQL
    Inspect(cmd::inspect::InspectArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Inspect(args) => {
            // Inspect never touches a store, just outputs to stdout
            cmd::inspect::run(args)
        }
        Command::Grouped(args) => {
            init_logging(&resolve_log_level(cli.log_level.as_deref(), &config), config.log.format)?;
            cmd::metrics::run_grouped(args, &config).await
        }
        Command::Top(args) => {
            init_logging(&resolve_log_level(cli.log_level.as_deref(), &config), config.log.format)?;
            cmd::metrics::run_top(args, &config).await
        }
        Command::Growth(args) => {
            init_logging(&resolve_log_level(cli.log_level.as_deref(), &config), config.log.format)?;
            cmd::metrics::run_growth(args, &config).await
        }
    }
}

/// Load the config file, or defaults when none is given
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Resolve the filter directive: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> String {
    config.log.directive(cli_level)
}

/// Initialize the tracing subscriber, writing to stderr
fn init_logging(directive: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .or_else(|_| EnvFilter::try_new(LogLevel::default().directive()))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}
