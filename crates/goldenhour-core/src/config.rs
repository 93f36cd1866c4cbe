//! Engine configuration loaded from environment variables.
//!
//! Every variable is optional except the backend URL, which belongs to the
//! client configuration. Values are validated at load time so the engine
//! never sees a zero interval or an empty event channel.

use std::time::Duration;

use goldenhour_client::config::parse_or;
use goldenhour_client::retry::{
    DEFAULT_ONE_SHOT_DELAY_MS, DEFAULT_ONE_SHOT_MAX_ATTEMPTS, DEFAULT_STATUS_RETRY_DELAY_MS,
};
use goldenhour_client::{ClientConfig, ConfigError, RetryPolicy};

/// Default status poll interval (2 seconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Default number of polls before a session expires.
pub const DEFAULT_POLL_MAX_TICKS: u32 = 30;

/// Default simulator frame interval.
pub const DEFAULT_SIM_TICK_INTERVAL_MS: u64 = 100;

/// Default upper bound on simulator frames.
pub const DEFAULT_SIM_MAX_STEPS: u32 = 100;

/// Default capacity of the subscriber event channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Status polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Time between polls.
    pub interval: Duration,
    /// Polls allowed before the session expires.
    pub max_ticks: u32,
    /// Retry policy around each status fetch.
    pub status_retry: RetryPolicy,
    /// Age after which the latest observation is reported stale.
    pub stale_after: Duration,
}

impl PollConfig {
    /// Wall-clock budget of one session: `interval * max_ticks`.
    pub const fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_ticks)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        let interval = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
        Self {
            interval,
            max_ticks: DEFAULT_POLL_MAX_TICKS,
            status_retry: RetryPolicy::status_polling(),
            stale_after: interval.saturating_mul(2),
        }
    }
}

/// Position simulator parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    /// Time between emitted frames.
    pub tick_interval: Duration,
    /// Upper bound on frames per simulation.
    pub max_steps: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_SIM_TICK_INTERVAL_MS),
            max_steps: DEFAULT_SIM_MAX_STEPS,
        }
    }
}

/// Complete tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Backend transport settings.
    pub client: ClientConfig,
    /// Status polling settings.
    pub poll: PollConfig,
    /// Retry policy for submit, notify and hospital detail.
    pub one_shot: RetryPolicy,
    /// Simulator settings.
    pub simulation: SimConfig,
    /// Capacity of the subscriber broadcast channel.
    pub event_capacity: usize,
}

impl TrackerConfig {
    /// Configuration with defaults for everything but the API URL.
    pub fn new(client: ClientConfig) -> Self {
        Self {
            client,
            poll: PollConfig::default(),
            one_shot: RetryPolicy::one_shot(),
            simulation: SimConfig::default(),
            event_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Client variables are documented on [`ClientConfig::from_env`].
    /// Engine variables (all optional):
    /// - `POLL_INTERVAL_MS` -- time between polls (default 2000)
    /// - `POLL_MAX_TICKS` -- polls before expiry (default 30)
    /// - `POLL_STALE_AFTER_MS` -- freshness window (default two intervals)
    /// - `STATUS_RETRY_DELAY_MS` -- delay between failed status fetches (default 2000)
    /// - `ONE_SHOT_MAX_ATTEMPTS` -- attempts for submit/notify/detail (default 3)
    /// - `ONE_SHOT_RETRY_DELAY_MS` -- delay between those attempts (default 1000)
    /// - `SIM_TICK_INTERVAL_MS` -- simulator frame interval (default 100)
    /// - `SIM_MAX_STEPS` -- simulator frame cap (default 100)
    /// - `EVENT_CHANNEL_CAPACITY` -- subscriber buffer (default 256)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client = ClientConfig::from_lookup(&lookup)?;

        let interval_ms = positive(&lookup, "POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        let interval = Duration::from_millis(interval_ms);
        let max_ticks = positive(&lookup, "POLL_MAX_TICKS", DEFAULT_POLL_MAX_TICKS)?;
        let stale_after_ms: u64 = parse_or(
            &lookup,
            "POLL_STALE_AFTER_MS",
            interval_ms.saturating_mul(2),
        )?;
        let status_delay_ms: u64 = parse_or(
            &lookup,
            "STATUS_RETRY_DELAY_MS",
            DEFAULT_STATUS_RETRY_DELAY_MS,
        )?;

        let one_shot_attempts = positive(
            &lookup,
            "ONE_SHOT_MAX_ATTEMPTS",
            DEFAULT_ONE_SHOT_MAX_ATTEMPTS,
        )?;
        let one_shot_delay_ms: u64 =
            parse_or(&lookup, "ONE_SHOT_RETRY_DELAY_MS", DEFAULT_ONE_SHOT_DELAY_MS)?;

        let sim_tick_ms = positive(&lookup, "SIM_TICK_INTERVAL_MS", DEFAULT_SIM_TICK_INTERVAL_MS)?;
        let sim_max_steps = positive(&lookup, "SIM_MAX_STEPS", DEFAULT_SIM_MAX_STEPS)?;

        let event_capacity = positive(
            &lookup,
            "EVENT_CHANNEL_CAPACITY",
            DEFAULT_EVENT_CHANNEL_CAPACITY,
        )?;

        Ok(Self {
            client,
            poll: PollConfig {
                interval,
                max_ticks,
                status_retry: RetryPolicy::unbounded(Duration::from_millis(status_delay_ms)),
                stale_after: Duration::from_millis(stale_after_ms),
            },
            one_shot: RetryPolicy::fixed(
                one_shot_attempts,
                Duration::from_millis(one_shot_delay_ms),
            ),
            simulation: SimConfig {
                tick_interval: Duration::from_millis(sim_tick_ms),
                max_steps: sim_max_steps,
            },
            event_capacity,
        })
    }
}

/// [`parse_or`] for values that must be greater than zero.
fn positive<T, F>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    T: core::str::FromStr + PartialOrd + Default,
    T::Err: core::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, name, default)?;
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name: name.to_owned(),
            reason: "must be greater than zero".to_owned(),
        })
    }
}
