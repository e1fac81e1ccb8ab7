//! finclust: cluster companies by financial ratios
//!
//! Loads a snapshot of reports, runs k-medoids (and optionally the range
//! analyzer), and writes a JSON report.

use anyhow::{Context, Result};
use clap::Parser;
use finclust::report::AnalysisDocument;
use finclust::{load_records, write_cluster_statistics, Args, Engine, Record};
use std::io::{self, Write};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    run(&args, &mut io::stdout().lock())
}

/// Run one request. The JSON document goes to `--output` or `out`; everything
/// else goes to stderr.
fn run<W: Write>(args: &Args, out: &mut W) -> Result<()> {
    let start_time = Instant::now();

    // Validate request parameters before touching the input
    let k = args.cluster_count()?;
    let predict_values = args.parse_predict_values()?;
    let engine = Engine::new(args.engine_config());

    let records = load_records(&args.input)
        .with_context(|| format!("loading records from {}", args.input))?;

    let (analysis, ranges) = if args.ranges {
        let (analysis, ranges) = engine.analyze(&records, k)?;
        (analysis, Some(ranges))
    } else {
        (engine.cluster(&records, k)?, None)
    };

    if args.verbose {
        write_cluster_statistics(&mut io::stderr().lock(), &records, &analysis)?;
    }

    let mut document = AnalysisDocument::new(&analysis);
    document.ranges = ranges;
    if let Some(values) = predict_values {
        let candidate = Record::new("candidate", "", values)?;
        document.predicted_cluster = Some(analysis.predict(&candidate));
    }

    let json = serde_json::to_string_pretty(&document)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing report to {path}"))?;
            eprintln!("Report saved to: {}", path);
        }
        None => writeln!(out, "{json}")?,
    }

    if args.verbose {
        eprintln!(
            "Total processing time: {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
    }

    Ok(())
}
