//! Emergency submission, status and reconciled state types.
//!
//! Three shapes describe one emergency over its lifetime:
//!
//! - [`EmergencyReport`] -- what the dispatcher submits.
//! - [`StatusPayload`] -- what the status endpoint returns on every poll.
//!   Loosely typed on purpose: the backend signals assignment in more than
//!   one way and the engine must see all of them.
//! - [`EmergencyState`] -- the reconciled view published to the dashboard.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EmergencyStatus, Severity};
use crate::geo::Coordinates;
use crate::hospital::HospitalDetail;
use crate::ids::{EmergencyId, HospitalId};

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// An emergency as reported by the dispatcher.
///
/// Field names follow the backend request model (snake case).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EmergencyReport {
    /// Where the patient is.
    pub location: Coordinates,
    /// Observed symptoms, free text.
    pub symptoms: Vec<String>,
    /// Vital signs keyed by name (`heart_rate`, `blood_pressure`, ...).
    #[serde(default)]
    pub vitals: BTreeMap<String, serde_json::Value>,
    /// Patient age in years.
    pub age: u32,
    /// Free-text description of the incident.
    pub description: String,
    /// Where confirmations are sent.
    pub contact_email: String,
}

/// Result of the triage step, returned by the submit operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TriageResult {
    /// Identifier assigned to the new emergency.
    pub emergency_id: EmergencyId,
    /// Triage severity.
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Specialty the patient should be routed to.
    #[serde(default)]
    pub recommended_specialty: Option<String>,
    /// Expected response time in minutes.
    #[serde(default)]
    pub estimated_response_time: Option<u32>,
}

// ---------------------------------------------------------------------------
// Status polling
// ---------------------------------------------------------------------------

/// What the backend agents are currently doing for an emergency.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AgentActivity {
    /// Name of the agent that produced the latest update.
    #[serde(default)]
    pub agent_name: Option<String>,
    /// Human-readable progress message.
    #[serde(default)]
    pub message: Option<String>,
    /// Backend timestamp of the update, passed through verbatim.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl AgentActivity {
    /// Whether every field is absent.
    pub const fn is_empty(&self) -> bool {
        self.agent_name.is_none() && self.message.is_none() && self.timestamp.is_none()
    }
}

/// Raw response of the status endpoint.
///
/// `assigned_hospital` and `hospital` are kept as untyped JSON because the
/// backend sends either a bare reference (id string or number) or a full
/// hospital object under either key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StatusPayload {
    /// Echo of the emergency id, when the backend includes it.
    #[serde(default)]
    pub emergency_id: Option<EmergencyId>,
    /// Lifecycle status, when the backend includes it.
    #[serde(default)]
    pub status: Option<EmergencyStatus>,
    /// Triage severity.
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Specialty the patient should be routed to.
    #[serde(default)]
    pub recommended_specialty: Option<String>,
    /// Expected response time in minutes.
    #[serde(default)]
    pub estimated_response_time: Option<u32>,
    /// Hospital reference or inline hospital object.
    #[serde(default)]
    pub assigned_hospital: Option<serde_json::Value>,
    /// Inline hospital object merged by an earlier client.
    #[serde(default)]
    pub hospital: Option<serde_json::Value>,
    /// Agent progress fields, flattened on the wire.
    #[serde(flatten)]
    pub activity: AgentActivity,
}

impl StatusPayload {
    /// Whether this payload says a hospital has been assigned.
    ///
    /// `status == ASSIGNED`, a non-null `assignedHospital` and a non-null
    /// `hospital` are equivalent triggers.
    pub fn signals_assignment(&self) -> bool {
        self.status == Some(EmergencyStatus::Assigned)
            || self.assigned_hospital.as_ref().is_some_and(|v| !v.is_null())
            || self.hospital.as_ref().is_some_and(|v| !v.is_null())
    }
}

// ---------------------------------------------------------------------------
// Reconciled state
// ---------------------------------------------------------------------------

/// The reconciled view of one emergency.
///
/// Only the lifecycle engine produces these; consumers receive them behind
/// an `Arc` and never mutate them. `assigned_hospital` is only ever set
/// when `status` is [`EmergencyStatus::Assigned`]; an assigned state
/// without a hospital is a degraded assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EmergencyState {
    /// Emergency this state describes.
    pub emergency_id: EmergencyId,
    /// Lifecycle status.
    pub status: EmergencyStatus,
    /// Triage severity.
    pub severity: Option<Severity>,
    /// Specialty the patient should be routed to.
    pub recommended_specialty: Option<String>,
    /// Expected response time in minutes.
    pub estimated_response_time: Option<u32>,
    /// Full detail of the assigned hospital.
    pub assigned_hospital: Option<HospitalDetail>,
    /// Latest agent progress, if any was reported.
    pub agent_activity: Option<AgentActivity>,
    /// When this state was produced.
    pub last_updated: DateTime<Utc>,
}

impl EmergencyState {
    /// Initial state right after submission.
    pub fn submitted(triage: &TriageResult) -> Self {
        Self {
            emergency_id: triage.emergency_id.clone(),
            status: EmergencyStatus::Submitted,
            severity: triage.severity,
            recommended_specialty: triage.recommended_specialty.clone(),
            estimated_response_time: triage.estimated_response_time,
            assigned_hospital: None,
            agent_activity: None,
            last_updated: Utc::now(),
        }
    }

    /// Initial state for an emergency tracked by id only.
    pub fn unknown(emergency_id: EmergencyId) -> Self {
        Self {
            emergency_id,
            status: EmergencyStatus::Submitted,
            severity: None,
            recommended_specialty: None,
            estimated_response_time: None,
            assigned_hospital: None,
            agent_activity: None,
            last_updated: Utc::now(),
        }
    }

    /// Whether the hospital/status invariant holds.
    pub fn is_consistent(&self) -> bool {
        self.assigned_hospital.is_none() || self.status == EmergencyStatus::Assigned
    }

    /// Whether the assignment is confirmed but hospital detail is missing.
    pub fn is_degraded(&self) -> bool {
        self.status == EmergencyStatus::Assigned && self.assigned_hospital.is_none()
    }
}

// ---------------------------------------------------------------------------
// Hospital notification
// ---------------------------------------------------------------------------

/// Body of the notify-hospital call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NotifyRequest {
    /// Hospital to alert.
    pub hospital_id: HospitalId,
    /// Emergency the alert is about.
    pub emergency_id: EmergencyId,
}

/// Acknowledgement of a hospital notification.
///
/// Every field is optional; the backend has returned several shapes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NotifyAck {
    /// Explicit success flag.
    #[serde(default)]
    pub success: Option<bool>,
    /// Backend status string (for example `alerts_sent`).
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable confirmation.
    #[serde(default)]
    pub message: Option<String>,
    /// Confirmed arrival estimate in minutes.
    #[serde(default)]
    #[serde(alias = "eta")]
    pub eta_minutes: Option<u32>,
}
