//! Error types for the backend transport.
//!
//! Every failure of a remote call is folded into a [`TransportError`]
//! whose variant is the failure class. Callers decide what to do from the
//! class alone: the retry controller retries transient classes and gives
//! up immediately on the rest.

use crate::transport::Operation;

/// A failed call to the backend, classified by cause.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The backend rejected the credentials (HTTP 401).
    #[error("{operation}: unauthorized")]
    Unauthorized {
        /// The call that failed.
        operation: Operation,
    },

    /// The backend failed while handling the call (HTTP 5xx).
    #[error("{operation}: server fault (HTTP {status})")]
    ServerFault {
        /// The call that failed.
        operation: Operation,
        /// HTTP status code returned.
        status: u16,
    },

    /// The addressed resource does not exist (HTTP 404).
    #[error("{operation}: not found")]
    NotFound {
        /// The call that failed.
        operation: Operation,
    },

    /// No response reached the client (connect failure, timeout, reset).
    #[error("{operation}: network error: {message}")]
    Network {
        /// The call that failed.
        operation: Operation,
        /// Description from the HTTP client.
        message: String,
    },

    /// Any other failure: unexpected status, undecodable body.
    #[error("{operation}: {message}")]
    Unknown {
        /// The call that failed.
        operation: Operation,
        /// What went wrong.
        message: String,
    },
}

/// Failure class of a [`TransportError`], without the call details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// HTTP 401.
    Unauthorized,
    /// HTTP 5xx.
    ServerFault,
    /// HTTP 404.
    NotFound,
    /// No response.
    Network,
    /// Anything else.
    Unknown,
}

impl TransportError {
    /// The failure class.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Unauthorized { .. } => ErrorClass::Unauthorized,
            Self::ServerFault { .. } => ErrorClass::ServerFault,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Network { .. } => ErrorClass::Network,
            Self::Unknown { .. } => ErrorClass::Unknown,
        }
    }

    /// The call that failed.
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Unauthorized { operation }
            | Self::ServerFault { operation, .. }
            | Self::NotFound { operation }
            | Self::Network { operation, .. }
            | Self::Unknown { operation, .. } => *operation,
        }
    }
}

impl ErrorClass {
    /// Whether another attempt might succeed.
    ///
    /// Unauthorized needs new credentials and a missing emergency will not
    /// appear by asking again; everything else is treated as transient.
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::Unauthorized | Self::NotFound)
    }

    /// Lower-case name for logs and events.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::ServerFault => "server_fault",
            Self::NotFound => "not_found",
            Self::Network => "network",
            Self::Unknown => "unknown",
        }
    }
}

impl core::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors loading client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required env var {name}")]
    Missing {
        /// Variable name.
        name: String,
    },

    /// A variable is set but cannot be parsed.
    #[error("invalid {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: String,
        /// Parse failure description.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classes() {
        assert!(ErrorClass::ServerFault.is_retryable());
        assert!(ErrorClass::Network.is_retryable());
        assert!(ErrorClass::Unknown.is_retryable());
        assert!(!ErrorClass::Unauthorized.is_retryable());
        assert!(!ErrorClass::NotFound.is_retryable());
    }

    #[test]
    fn display_names_the_operation() {
        let err = TransportError::ServerFault {
            operation: Operation::GetStatus,
            status: 503,
        };
        assert_eq!(err.to_string(), "get_status: server fault (HTTP 503)");
        assert_eq!(err.class(), ErrorClass::ServerFault);
        assert_eq!(err.operation(), Operation::GetStatus);
    }
}
