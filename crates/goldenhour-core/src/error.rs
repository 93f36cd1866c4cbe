//! Engine-level error types.
//!
//! [`TrackerError`] is what subscribers see when a session or a one-shot
//! call fails. Transient transport failures never reach it directly: they
//! are absorbed by the retry controller and surface only as
//! [`TrackerError::RetryExhausted`] once attempts run out.

use goldenhour_client::{ErrorClass, RetryError, TransportError};

/// A failed tracker operation or poll session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    /// A non-retryable transport failure (unauthorized, not found).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Every permitted attempt failed; wraps the last error.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Attempts made.
        attempts: u32,
        /// Error of the final attempt.
        last: TransportError,
    },

    /// The session budget ran out before a terminal status was seen.
    #[error("no terminal status after {ticks} polls")]
    Timeout {
        /// Polls completed before expiry.
        ticks: u32,
    },

    /// The hospital-detail response contained no usable hospital.
    #[error("hospital detail response held no hospital")]
    NoHospitalDetail,
}

impl From<RetryError<TransportError>> for TrackerError {
    fn from(err: RetryError<TransportError>) -> Self {
        match err {
            RetryError::Fatal(err) => Self::Transport(err),
            RetryError::Exhausted { attempts, last } => Self::RetryExhausted { attempts, last },
        }
    }
}

/// Coarse failure category for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No response from the backend.
    Network,
    /// Credentials rejected.
    Unauthorized,
    /// Backend-side failure.
    ServerFault,
    /// The emergency does not exist.
    NotFound,
    /// The session budget ran out.
    Timeout,
    /// Anything else.
    Unknown,
}

impl TrackerError {
    /// Transport class of the underlying failure, if there was one.
    pub const fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::Transport(err) | Self::RetryExhausted { last: err, .. } => Some(err.class()),
            Self::Timeout { .. } | Self::NoHospitalDetail => None,
        }
    }

    /// Presentation category.
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::NoHospitalDetail => FailureKind::Unknown,
            Self::Transport(err) | Self::RetryExhausted { last: err, .. } => match err.class() {
                ErrorClass::Network => FailureKind::Network,
                ErrorClass::Unauthorized => FailureKind::Unauthorized,
                ErrorClass::ServerFault => FailureKind::ServerFault,
                ErrorClass::NotFound => FailureKind::NotFound,
                ErrorClass::Unknown => FailureKind::Unknown,
            },
        }
    }
}

/// Errors from the position simulator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// A route endpoint is not a valid coordinate.
    #[error("invalid {endpoint} coordinate ({lat}, {lng})")]
    InvalidCoordinate {
        /// `start` or `end`.
        endpoint: &'static str,
        /// Latitude supplied.
        lat: f64,
        /// Longitude supplied.
        lng: f64,
    },
}
