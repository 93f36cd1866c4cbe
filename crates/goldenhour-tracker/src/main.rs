//! Dispatcher console for the Golden Hour emergency tracker.
//!
//! Submits an emergency report (or picks up an existing emergency), polls
//! its status until a hospital is assigned, and logs every step. Once the
//! hospital is known, the ambulance trip is simulated and logged too.
//!
//! ```text
//! report.json --> submit --> poll session --> hospital assigned --> ambulance
//! ```
//!
//! Exits non-zero when the session fails, expires or ends in `ERROR`.

mod cli;
mod follow;

use std::process::ExitCode;

use anyhow::Context;
use goldenhour_core::{Tracker, TrackerConfig};
use goldenhour_types::EmergencyReport;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, RunOptions};
use crate::follow::{exit_code, follow};

/// Application entry point.
///
/// # Errors
///
/// Returns an error on bad arguments, bad configuration, an unreadable
/// report or a failed submission.
#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let command = Command::parse(std::env::args().skip(1))?;

    let config = TrackerConfig::from_env()?;
    let options = RunOptions::from_env()?;
    info!(
        api_url = config.client.api_url,
        poll_interval_ms = u64::try_from(config.poll.interval.as_millis()).unwrap_or(u64::MAX),
        max_ticks = config.poll.max_ticks,
        simulate = options.simulate,
        "configuration loaded"
    );

    let tracker = Tracker::from_config(&config)?;
    let events = tracker.subscribe();

    let (emergency_id, generation, patient) = match command {
        Command::Submit(path) => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let report: EmergencyReport = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?;
            let tracking = tracker
                .submit_and_track(&report)
                .await
                .context("submitting emergency")?;
            (
                tracking.triage.emergency_id,
                tracking.generation,
                Some(report.location),
            )
        }
        Command::Track(emergency_id) => {
            let generation = tracker.track(emergency_id.clone());
            (emergency_id, generation, None)
        }
    };

    let outcome = tokio::select! {
        outcome = follow(&tracker, events, generation, patient, options) => outcome,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "cannot listen for ctrl-c");
            }
            tracker.stop(&emergency_id);
            info!(emergency_id = %emergency_id, "interrupted");
            return Ok(ExitCode::from(130));
        }
    };

    info!(emergency_id = %emergency_id, outcome = ?outcome, "tracking finished");
    Ok(exit_code(outcome.as_ref()))
}
