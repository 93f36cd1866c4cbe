//! Backend transport and retry controller for the Golden Hour tracker.
//!
//! This crate is the only place that talks to the network. Everything above
//! it depends on the [`EmergencyApi`] trait rather than on HTTP.
//!
//! # Modules
//!
//! - [`config`] -- Client configuration loaded from environment variables.
//! - [`credentials`] -- [`CredentialStore`] capability for bearer tokens.
//! - [`error`] -- [`TransportError`] and its failure classes.
//! - [`retry`] -- [`RetryPolicy`] and the bounded [`with_retry`] loop.
//! - [`transport`] -- [`EmergencyApi`] and its HTTP implementation.
//!
//! [`CredentialStore`]: credentials::CredentialStore
//! [`TransportError`]: error::TransportError
//! [`RetryPolicy`]: retry::RetryPolicy
//! [`with_retry`]: retry::with_retry
//! [`EmergencyApi`]: transport::EmergencyApi

pub mod config;
pub mod credentials;
pub mod error;
pub mod retry;
pub mod transport;

pub use config::ClientConfig;
pub use credentials::{Anonymous, CredentialStore, MemoryCredentials};
pub use error::{ConfigError, ErrorClass, TransportError};
pub use retry::{
    Backoff, RetryAttempt, RetryError, RetryPolicy, Retryable, with_retry, with_retry_observed,
};
pub use transport::{EmergencyApi, HttpTransport, Operation};
