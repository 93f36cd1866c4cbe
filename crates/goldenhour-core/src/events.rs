//! Events published to subscribers.
//!
//! The engine pushes every observable change through one broadcast channel.
//! One-time notifications (assignment, degraded assignment) are emitted at
//! most once per session; state updates are emitted on every poll.

use std::sync::Arc;

use goldenhour_types::{EmergencyId, EmergencyState, EmergencyStatus, HospitalDetail};

use crate::error::TrackerError;
use crate::poller::PollPhase;

/// How a poll session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A terminal status was reached (`ASSIGNED` or `ERROR`).
    Completed {
        /// The terminal status.
        status: EmergencyStatus,
    },
    /// The session was stopped on request.
    Stopped,
    /// The poll budget ran out.
    Expired {
        /// Polls completed.
        ticks: u32,
    },
    /// A non-retryable failure ended the session.
    Failed {
        /// What failed.
        error: TrackerError,
    },
}

impl SessionOutcome {
    /// Poller phase this outcome leaves the session in.
    pub const fn phase(&self) -> PollPhase {
        match self {
            Self::Completed { .. } | Self::Stopped => PollPhase::Stopped,
            Self::Expired { .. } => PollPhase::Expired,
            Self::Failed { .. } => PollPhase::Failed,
        }
    }

    /// The error to show, if the outcome is a failure.
    ///
    /// Expiry is reported as [`TrackerError::Timeout`].
    pub fn error(&self) -> Option<TrackerError> {
        match self {
            Self::Expired { ticks } => Some(TrackerError::Timeout { ticks: *ticks }),
            Self::Failed { error } => Some(error.clone()),
            Self::Completed { .. } | Self::Stopped => None,
        }
    }
}

/// Something subscribers should know about.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// A poll produced a new reconciled state.
    StateUpdated {
        /// Session that produced it.
        generation: u64,
        /// The state.
        state: Arc<EmergencyState>,
    },

    /// A hospital was assigned and its detail merged.
    HospitalAssigned {
        /// Session that observed it.
        generation: u64,
        /// Emergency assigned.
        emergency_id: EmergencyId,
        /// The assigned hospital.
        hospital: Arc<HospitalDetail>,
    },

    /// Assignment confirmed but hospital detail could not be obtained.
    DegradedAssignment {
        /// Session that observed it.
        generation: u64,
        /// Emergency assigned.
        emergency_id: EmergencyId,
        /// Why detail is missing.
        cause: TrackerError,
    },

    /// A poll session ended.
    SessionEnded {
        /// Session that ended.
        generation: u64,
        /// Emergency it tracked.
        emergency_id: EmergencyId,
        /// How it ended.
        outcome: SessionOutcome,
    },
}

impl TrackerEvent {
    /// Emergency the event is about.
    pub fn emergency_id(&self) -> &EmergencyId {
        match self {
            Self::StateUpdated { state, .. } => &state.emergency_id,
            Self::HospitalAssigned { emergency_id, .. }
            | Self::DegradedAssignment { emergency_id, .. }
            | Self::SessionEnded { emergency_id, .. } => emergency_id,
        }
    }

    /// Session generation that produced the event.
    pub const fn generation(&self) -> u64 {
        match self {
            Self::StateUpdated { generation, .. }
            | Self::HospitalAssigned { generation, .. }
            | Self::DegradedAssignment { generation, .. }
            | Self::SessionEnded { generation, .. } => *generation,
        }
    }
}
