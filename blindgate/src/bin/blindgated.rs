//! Daemon bridging one window covering between the host and the device.
//!
//! The host pipes broker traffic to stdin and reads commands and
//! notifications from stdout, one JSON object per line (see
//! `blindgate::bridge`). Logs go to stderr, or journald under systemd.

use std::env;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use blindgate::bridge::Bridge;
use blindgate::config::CoverConfig;
use blindgate::cover::{CoverController, CoverEngine};
use blindgate::tracing::prelude::*;

const CHANNEL_DEPTH: usize = 32;

#[tokio::main]
async fn main() -> Result<()> {
    blindgate::tracing::init_journald_or_stderr();

    let Some(path) = env::args()
        .nth(1)
        .or_else(|| env::var("BLINDGATE_CONFIG").ok())
    else {
        eprintln!("Usage: blindgated <config.json>");
        eprintln!();
        eprintln!("Environment:");
        eprintln!("  BLINDGATE_CONFIG    config path when no argument is given");
        eprintln!("  RUST_LOG            log filter (default: info)");
        std::process::exit(1);
    };

    let config =
        CoverConfig::load(&path).with_context(|| format!("loading configuration from {path}"))?;

    info!(
        cover = %config.name,
        topic = %config.topic_base,
        max_rate = ?config.max_rate(),
        consolidate_ms = config.target_consolidate().as_millis() as u64,
        "Starting window covering bridge"
    );

    let (event_tx, event_rx) = mpsc::channel(CHANNEL_DEPTH);
    let (notify_tx, notify_rx) = mpsc::channel(CHANNEL_DEPTH);
    let (command_tx, command_rx) = mpsc::channel(CHANNEL_DEPTH);
    let running = CancellationToken::new();

    let engine = CoverEngine::new(&config);
    let controller = CoverController::new(engine, event_rx, notify_tx, command_tx);
    let controller = tokio::spawn(controller.run(running.clone()));

    let bridge = Bridge::new(
        tokio::io::stdin(),
        tokio::io::stdout(),
        event_tx,
        notify_rx,
        command_rx,
    );
    let mut bridge = tokio::spawn(bridge.run(running.clone()));

    // End of input closes the event channel; the controller then stops on
    // its own and the bridge returns once its output is written.
    let bridge_result = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("listening for ctrl-c")?;
            info!("Interrupt received, shutting down");
            running.cancel();
            (&mut bridge).await
        }
        result = &mut bridge => result,
    };

    match bridge_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(error = %e, "Bridge failed");
            running.cancel();
        }
        Err(e) => {
            error!(error = %e, "Bridge task panicked");
            running.cancel();
        }
    }

    controller.await.context("joining cover controller")?;
    info!("Shutdown complete");

    Ok(())
}
