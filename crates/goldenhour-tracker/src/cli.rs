//! Command-line arguments and run options.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use goldenhour_client::ConfigError;
use goldenhour_client::config::parse_or;
use goldenhour_types::EmergencyId;

pub const USAGE: &str = "usage: goldenhour-tracker <report.json> | --track <emergency-id>";

/// Default simulated trip length.
const DEFAULT_TRIP_MS: u64 = 10_000;

/// What the console was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Submit the report in this file, then track it.
    Submit(PathBuf),
    /// Track an emergency that was submitted elsewhere.
    Track(EmergencyId),
}

impl Command {
    /// Parse the arguments after the program name.
    pub fn parse<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let command = match args.next().as_deref() {
            Some("--track") => match args.next() {
                Some(id) if !id.trim().is_empty() => Self::Track(EmergencyId::new(id.trim())),
                _ => bail!("--track needs an emergency id\n{USAGE}"),
            },
            Some("-h" | "--help") | None => bail!(USAGE),
            Some(flag) if flag.starts_with('-') => bail!("unknown option {flag}\n{USAGE}"),
            Some(path) => Self::Submit(PathBuf::from(path)),
        };
        if let Some(extra) = args.next() {
            bail!("unexpected argument {extra}\n{USAGE}");
        }
        Ok(command)
    }
}

/// Console behavior beyond the engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Drive the ambulance simulation once a hospital is assigned.
    pub simulate: bool,
    /// Length of the simulated trip.
    pub trip: Duration,
}

impl RunOptions {
    /// Load from `SIMULATE_AMBULANCE` and `AMBULANCE_TRIP_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let simulate = parse_or(&lookup, "SIMULATE_AMBULANCE", true)?;
        let trip_ms: u64 = parse_or(&lookup, "AMBULANCE_TRIP_MS", DEFAULT_TRIP_MS)?;
        Ok(Self {
            simulate,
            trip: Duration::from_millis(trip_ms),
        })
    }
}
