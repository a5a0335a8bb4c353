use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use spanstat::config::load_config;
use spanstat::report::HistogramReport;
use spanstat::stats::Summary;
use spanstat::stream::{consume, JsonlEventStream};

#[derive(Debug, Parser)]
#[command(name = "spanstat")]
#[command(about = "Correlate start/end trace events into duration statistics")]
#[command(version)]
struct Command {
    /// Report configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// JSON-lines trace input; stdin when not given
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Directory the CSV and render-input artifacts are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

fn run(opts: Command) -> Result<()> {
    let mut reports = load_config(&opts.config)?;

    match &opts.trace {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open trace {}", path.display()))?;
            consume(&mut reports, JsonlEventStream::new(BufReader::new(file)))?;
        }
        None => {
            let stdin = std::io::stdin();
            consume(&mut reports, JsonlEventStream::new(stdin.lock()))?;
        }
    }

    for report in &reports {
        report.log_stream_warnings();
        print_summary(report)?;
        report.write_csv(&opts.output_dir)?;
        report.write_render_inputs(&opts.output_dir)?;
    }
    Ok(())
}

/// Print the per-series statistics table for one report, with the
/// aggregate of every series as the final "all" row.
fn print_summary(report: &HistogramReport) -> Result<()> {
    let inputs = report.render_inputs()?;

    let mut headers = vec!["series".to_string()];
    headers.extend(Summary::HEADER.iter().map(|h| h.to_string()));

    let mut rows = Vec::new();
    for series in inputs.series.iter().chain(std::iter::once(&inputs.all)) {
        let mut row = vec![series.name.clone()];
        row.extend(series.summary.row());
        rows.push(row);
    }

    println!("{}", inputs.title);
    print_table(&headers, &rows);
    println!();
    Ok(())
}

fn print_table(headers: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
    for row in rows {
        for (i, val) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(val.len());
            }
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_line.join(" | "));

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", sep.join("-+-"));

    for row in rows {
        let row_line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{:width$}", v, width = widths.get(i).copied().unwrap_or(10)))
            .collect();
        println!("{}", row_line.join(" | "));
    }
}

fn main() -> Result<()> {
    let opts = Command::parse();

    let filter = if opts.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(opts)
}
