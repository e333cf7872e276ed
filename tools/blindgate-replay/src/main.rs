//! Replays a captured window-covering session through the blindgate
//! engine and prints what it would have forwarded, dropped, and
//! committed.
//!
//! Run with `RUST_LOG=blindgate=debug` to see the engine's reasons for
//! each dropped report.

mod capture;
mod replay;

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use blindgate::config::CoverConfig;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::capture::{Source, read_capture};
use crate::replay::{Outcome, Replay, Step, Summary};

/// Topic used when no configuration file is given.
const DEFAULT_TOPIC: &str = "zigbee2mqtt/blind";

#[derive(Parser, Debug)]
#[command(name = "blindgate-replay")]
#[command(about = "Replay captured window-covering telemetry through the blindgate engine")]
struct Args {
    /// Capture CSV with columns time_ms,source,payload
    capture: PathBuf,

    /// Cover configuration JSON (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override maxRate (%/s); 0 disables the rate check
    #[arg(long)]
    max_rate: Option<f64>,

    /// Override targetConsolidate (ms)
    #[arg(long)]
    consolidate_ms: Option<u64>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    let mut config = match &args.config {
        Some(path) => CoverConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => CoverConfig::new(DEFAULT_TOPIC),
    };
    if let Some(max_rate) = args.max_rate {
        config.max_rate = max_rate;
    }
    if let Some(ms) = args.consolidate_ms {
        config.target_consolidate_ms = ms;
    }

    let file = File::open(&args.capture)
        .with_context(|| format!("opening capture {}", args.capture.display()))?;
    let rows = read_capture(file)?;
    tracing::debug!(rows = rows.len(), capture = %args.capture.display(), "Capture loaded");

    println!(
        "{} {} rows, maxRate {}, quiet {} ms",
        "Replaying".bold(),
        rows.len(),
        config
            .max_rate()
            .map_or_else(|| "off".to_string(), |rate| format!("{rate}%/s")),
        config.target_consolidate().as_millis()
    );

    let steps = Replay::new(&config).run(&rows);
    for step in &steps {
        println!("{}", render(step));
    }

    let summary = Summary::of(&steps);
    println!(
        "{} {} forwarded, {} suppressed, {} writes -> {} commits, {} invalid",
        "Summary".bold(),
        summary.notified,
        summary.suppressed.to_string().yellow(),
        summary.writes,
        summary.commits.to_string().green(),
        summary.invalid.to_string().red()
    );

    Ok(())
}

fn render(step: &Step) -> String {
    let time = format!("{:>8} ms", step.time_ms).dimmed();

    let line = match &step.outcome {
        Outcome::Notified(n) => format!("-> controller  {} = {}", n.property, n.value).cyan(),
        Outcome::Suppressed { position } => {
            format!("   suppressed  position {position} (implausible)").yellow()
        }
        Outcome::Armed { value, due_ms } => {
            format!("   write       target {value}, due at {due_ms} ms").normal()
        }
        Outcome::Unchanged { value } => {
            format!("   write       target {value} unchanged").dimmed()
        }
        Outcome::Committed { topic, payload } => {
            format!("-> device      {topic} = {payload}").green().bold()
        }
        Outcome::Invalid { source, error } => {
            let side = match source {
                Source::Device => "device",
                Source::Controller => "controller",
            };
            format!("   invalid     {side} row: {error}").red()
        }
    };

    format!("{time}  {line}")
}
