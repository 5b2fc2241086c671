//! Inspect command - show how a filter document compiles
//!
//! # Usage
//!
//! ```bash
//! blogstat inspect '{"field": "viewer_country", "in": ["US", "FR"]}'
//! blogstat inspect @filters.json --format json
//! ```

use std::io::{self, Write};

use anyhow::{Context, Result};
use blogstat_analytics::{Predicate, compile, predicate_to_sql};
use clap::Args;
use serde_json::json;

use super::metrics::parse_filters;

/// Inspect command arguments
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Filter document as JSON, or @path to read it from a file
    pub filters: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Run the inspect command
pub fn run(args: InspectArgs) -> Result<()> {
    let doc = parse_filters(Some(&args.filters))?;
    let predicate = compile(doc.as_ref()).context("invalid filter document")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_inspection(&mut out, &predicate, &args.format)
}

fn write_inspection<W: Write>(out: &mut W, predicate: &Predicate, format: &str) -> Result<()> {
    let bound = predicate.bind().context("filter cannot be applied")?;
    let sql = predicate_to_sql(&bound);
    let fields: Vec<&str> = predicate
        .conditions()
        .iter()
        .map(|c| c.field.as_str())
        .collect();

    match format {
        "json" => {
            let value = json!({
                "predicate": predicate.to_string(),
                "fields": fields,
                "sql": sql,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        }
        _ => {
            writeln!(out, "Predicate: {}", predicate)?;
            writeln!(out, "Fields:    {}", fields.join(", "))?;
            writeln!(out, "SQL:       {}", sql)?;
        }
    }

    Ok(())
}
