//! Configuration for the backend transport.
//!
//! All configuration is loaded from environment variables. Loading goes
//! through a lookup function so tests can supply values without touching
//! the process environment.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Default per-call timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Path appended to the backend URL to reach the versioned API.
const API_PREFIX: &str = "/api/v1";

/// Complete transport configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the versioned API (e.g. `http://localhost:8000/api/v1`).
    pub api_url: String,
    /// Fixed timeout applied to every call.
    pub request_timeout: Duration,
    /// Token to seed the credential store with.
    pub auth_token: Option<String>,
}

impl ClientConfig {
    /// Configuration pointing at `api_url` with default timeout and no token.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            auth_token: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required variables (one of):
    /// - `GOLDENHOUR_API_URL` -- full API base URL
    /// - `GOLDENHOUR_BACKEND_URL` -- backend origin; `/api/v1` is appended
    ///
    /// Optional variables:
    /// - `GOLDENHOUR_AUTH_TOKEN` -- bearer token attached to every call
    /// - `GOLDENHOUR_REQUEST_TIMEOUT_MS` -- per-call timeout (default 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = match lookup("GOLDENHOUR_API_URL") {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None => {
                let backend = lookup("GOLDENHOUR_BACKEND_URL").ok_or_else(|| {
                    ConfigError::Missing {
                        name: "GOLDENHOUR_BACKEND_URL".to_owned(),
                    }
                })?;
                format!("{}{API_PREFIX}", backend.trim_end_matches('/'))
            }
        };

        let timeout_ms: u64 = parse_or(
            &lookup,
            "GOLDENHOUR_REQUEST_TIMEOUT_MS",
            DEFAULT_REQUEST_TIMEOUT_MS,
        )?;

        let auth_token = lookup("GOLDENHOUR_AUTH_TOKEN").filter(|t| !t.trim().is_empty());

        Ok(Self {
            api_url,
            request_timeout: Duration::from_millis(timeout_ms),
            auth_token,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
///
/// Shared with the engine configuration so every loader reports parse
/// failures the same way.
pub fn parse_or<T, F>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name: name.to_owned(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
