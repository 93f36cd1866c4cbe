//! Enumeration types for the emergency lifecycle.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Lifecycle status
// ---------------------------------------------------------------------------

/// Where an emergency is in its lifecycle as reported by the backend.
///
/// The backend spells statuses in upper case; the agent-activity feed uses
/// lower case (`processing`, `completed`, `error`), so both spellings are
/// accepted on input. Output is always upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum EmergencyStatus {
    /// Accepted by the backend, triage not started.
    #[serde(alias = "submitted", alias = "REGISTERED", alias = "registered")]
    Submitted,
    /// Triage and routing agents are working on it.
    #[serde(alias = "processing", alias = "PENDING", alias = "pending")]
    Processing,
    /// A hospital has been designated.
    #[serde(alias = "assigned")]
    Assigned,
    /// The backend gave up on this emergency.
    #[serde(alias = "error", alias = "FAILED", alias = "failed")]
    Error,
}

impl EmergencyStatus {
    /// Whether no further automatic transition is expected.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Assigned | Self::Error)
    }

    /// Upper-case wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Processing => "PROCESSING",
            Self::Assigned => "ASSIGNED",
            Self::Error => "ERROR",
        }
    }
}

impl core::fmt::Display for EmergencyStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Triage severity
// ---------------------------------------------------------------------------

/// Triage severity assigned by the backend triage agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Severity {
    /// Non-urgent.
    #[serde(alias = "LOW")]
    Low,
    /// Urgent but stable.
    #[serde(alias = "MEDIUM")]
    Medium,
    /// Needs rapid response.
    #[serde(alias = "HIGH")]
    High,
    /// Life threatening; inside the golden hour window.
    #[serde(alias = "CRITICAL")]
    Critical,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accepts_both_casings() {
        let upper: Option<EmergencyStatus> = serde_json::from_str("\"ASSIGNED\"").ok();
        let lower: Option<EmergencyStatus> = serde_json::from_str("\"processing\"").ok();
        assert_eq!(upper, Some(EmergencyStatus::Assigned));
        assert_eq!(lower, Some(EmergencyStatus::Processing));
    }

    #[test]
    fn status_serializes_upper_case() {
        let json = serde_json::to_string(&EmergencyStatus::Submitted).ok();
        assert_eq!(json.as_deref(), Some("\"SUBMITTED\""));
    }

    #[test]
    fn terminal_statuses() {
        assert!(EmergencyStatus::Assigned.is_terminal());
        assert!(EmergencyStatus::Error.is_terminal());
        assert!(!EmergencyStatus::Processing.is_terminal());
        assert!(!EmergencyStatus::Submitted.is_terminal());
    }

    #[test]
    fn severity_ordering_follows_urgency() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
        let parsed: Option<Severity> = serde_json::from_str("\"critical\"").ok();
        assert_eq!(parsed, Some(Severity::Critical));
    }
}
