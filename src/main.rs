use anyhow::{anyhow, Context, Result};
use chartseries::config::ChartConfig;
use chartseries::data::RowSet;
use clap::Parser;
use serde_json::Value;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chartseries")]
#[command(about = "Build chart datasets from tabular rows and a chart config", long_about = None)]
struct Args {
    /// Chart config JSON file. Without it stdin must hold {"rows": [...], "config": {...}}
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read rows from stdin as CSV with a header line
    #[arg(long, requires = "config")]
    csv: bool,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let (rows, config) = read_input(&args)?;

    let output = chartseries::build_chart(&rows, &config).context("Failed to build chart series")?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .context("Failed to serialize chart output")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json).context("Failed to write output to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}

fn read_input(args: &Args) -> Result<(RowSet, ChartConfig)> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;

    let Some(path) = &args.config else {
        let envelope: Value = serde_json::from_str(&input).context("Failed to parse input envelope")?;
        let rows = envelope
            .get("rows")
            .ok_or_else(|| anyhow!("Input envelope has no \"rows\" field"))?;
        let config = envelope
            .get("config")
            .ok_or_else(|| anyhow!("Input envelope has no \"config\" field"))?;
        let config: ChartConfig =
            serde_json::from_value(config.clone()).context("Invalid chart configuration")?;
        return Ok((RowSet::from_json(rows)?, config));
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = ChartConfig::from_json(&text)?;

    let rows = if args.csv {
        RowSet::from_csv_reader(input.as_bytes()).context("Failed to read CSV rows")?
    } else {
        let value: Value = serde_json::from_str(&input).context("Failed to parse JSON rows")?;
        RowSet::from_json(&value)?
    };
    Ok((rows, config))
}
