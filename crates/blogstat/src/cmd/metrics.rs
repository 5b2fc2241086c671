//! Selector commands - grouped metrics, top-N rankings, growth time series
//!
//! # Usage
//!
//! ```bash
//! blogstat grouped --object country --range month --data data/views.json
//! blogstat grouped --object user --range week --format csv
//!
//! blogstat top user --start 2024-03-01 --end 2024-03-31
//! blogstat top blog --filters @filters.json --format json
//!
//! blogstat growth month --user ann
//! ```

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use blogstat_analytics::{
    CompareType, MetricRow, MetricsEngine, ObjectType, RangeType, TopType,
};
use blogstat_config::Config;
use blogstat_query::OutputFormat;
use clap::Args;
use serde_json::Value;

use super::store::{StoreArgs, build_store};

/// Arguments shared by every selector
#[derive(Args, Debug)]
pub struct SelectorArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Filter document as JSON, or @path to read it from a file
    #[arg(long)]
    pub filters: Option<String>,

    /// Output format (table, json, csv)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Grouped metrics arguments
#[derive(Args, Debug)]
pub struct GroupedArgs {
    /// Grouping dimension (country, user)
    #[arg(short, long, default_value = "country")]
    pub object: String,

    /// Time bucket (month, week, year)
    #[arg(short, long, default_value = "month")]
    pub range: String,

    #[command(flatten)]
    pub common: SelectorArgs,
}

/// Top-N arguments
#[derive(Args, Debug)]
pub struct TopArgs {
    /// Ranked dimension (user, country, blog)
    pub top_type: String,

    /// Inclusive start (YYYY-MM-DD or ISO 8601 timestamp)
    #[arg(long)]
    pub start: Option<String>,

    /// Inclusive end (YYYY-MM-DD or ISO 8601 timestamp)
    #[arg(long)]
    pub end: Option<String>,

    #[command(flatten)]
    pub common: SelectorArgs,
}

/// Growth time series arguments
#[derive(Args, Debug)]
pub struct GrowthArgs {
    /// Bucket width (day, week, month, year)
    pub compare_type: String,

    /// Only blogs owned by this user
    #[arg(short, long)]
    pub user: Option<String>,

    #[command(flatten)]
    pub common: SelectorArgs,
}

/// Run the grouped metrics selector
pub async fn run_grouped(args: GroupedArgs, config: &Config) -> Result<()> {
    let object_type = ObjectType::parse(&args.object)?;
    let range = RangeType::parse(&args.range)?;
    let format = parse_format(&args.common.format)?;
    let filters = parse_filters(args.common.filters.as_deref())?;

    let engine = MetricsEngine::new(build_store(&args.common.store, config)?);
    let rows = engine
        .blog_views_get_grouped_metrics(object_type, range, filters.as_ref())
        .await?;

    let label = match object_type {
        ObjectType::Country => "Country",
        ObjectType::User => "User",
    };
    print_rows(&rows, [label, "Blogs", "Views"], format)?;
    eprintln!("\n[{}]", engine.store_name());
    Ok(())
}

/// Run the top-N selector
pub async fn run_top(args: TopArgs, config: &Config) -> Result<()> {
    let top_type = TopType::parse(&args.top_type)?;
    let format = parse_format(&args.common.format)?;
    let filters = parse_filters(args.common.filters.as_deref())?;

    let engine = MetricsEngine::new(build_store(&args.common.store, config)?);
    let rows = engine
        .top_get_ranked(
            top_type,
            args.start.as_deref(),
            args.end.as_deref(),
            filters.as_ref(),
        )
        .await?;

    print_rows(&rows, top_columns(top_type), format)?;
    eprintln!("\n[{}]", engine.store_name());
    Ok(())
}

/// Run the growth selector
pub async fn run_growth(args: GrowthArgs, config: &Config) -> Result<()> {
    let compare_type = CompareType::parse(&args.compare_type)?;
    let format = parse_format(&args.common.format)?;
    let filters = parse_filters(args.common.filters.as_deref())?;

    let engine = MetricsEngine::new(build_store(&args.common.store, config)?);
    let rows = engine
        .performance_get_time_series(compare_type, args.user.as_deref(), filters.as_ref())
        .await?;

    print_rows(&rows, ["Period", "Views", "Growth %"], format)?;
    eprintln!("\n[{}]", engine.store_name());
    Ok(())
}

fn top_columns(top_type: TopType) -> [&'static str; 3] {
    match top_type {
        TopType::User => ["Blogs", "Views", "Countries"],
        TopType::Country => ["Users", "Views", "Blogs"],
        TopType::Blog => ["Users", "Views", "Countries"],
    }
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    format
        .parse::<OutputFormat>()
        .map_err(|e| anyhow::anyhow!("{} (use table, json or csv)", e))
}

/// Parse `--filters`: inline JSON, or `@path` for a JSON file
pub fn parse_filters(raw: Option<&str>) -> Result<Option<Value>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("failed to read filters from {}", path))?,
        None => raw.to_string(),
    };

    let value = serde_json::from_str(&text).context("filters must be a JSON document")?;
    Ok(Some(value))
}

fn print_rows(rows: &[MetricRow], columns: [&str; 3], format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_rows(&mut out, rows, columns, format)
}

fn write_rows<W: Write>(
    out: &mut W,
    rows: &[MetricRow],
    columns: [&str; 3],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(rows)?;
            writeln!(out, "{}", json)?;
        }
        OutputFormat::Csv => {
            writeln!(out, "{}", columns.map(csv_field).join(","))?;
            for row in rows {
                writeln!(
                    out,
                    "{},{},{}",
                    csv_field(&row.x.to_string()),
                    row.y,
                    csv_field(&row.z.to_string())
                )?;
            }
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                writeln!(out, "(no data)")?;
                return Ok(());
            }

            let labels: Vec<String> = rows.iter().map(|r| r.x.to_string()).collect();
            let width = labels
                .iter()
                .map(|l| l.len())
                .chain(std::iter::once(columns[0].len()))
                .max()
                .unwrap_or(0)
                .min(40);

            writeln!(
                out,
                "{:<width$}  {:>12}  {:>12}",
                columns[0],
                columns[1],
                columns[2],
                width = width
            )?;
            writeln!(out, "{}", "-".repeat(width + 28))?;
            for (row, label) in rows.iter().zip(&labels) {
                writeln!(
                    out,
                    "{:<width$}  {:>12}  {:>12}",
                    truncate(label, width),
                    row.y,
                    row.z.to_string(),
                    width = width
                )?;
            }

            writeln!(out, "{}", "-".repeat(width + 28))?;
            writeln!(out, "Rows: {}", rows.len())?;
        }
    }

    Ok(())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let kept: String = s.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
