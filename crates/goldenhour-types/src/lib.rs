//! Shared type definitions for the Golden Hour emergency tracker.
//!
//! This crate is the single source of truth for the data exchanged between
//! the backend API, the lifecycle engine, and the dashboard. Types defined
//! here flow downstream to `TypeScript` via `ts-rs` so the dashboard renders
//! exactly what the engine publishes.
//!
//! # Modules
//!
//! - [`ids`] -- Opaque identifier wrappers for emergencies and hospitals
//! - [`enums`] -- Lifecycle status and triage severity
//! - [`geo`] -- Coordinates and simulated positions
//! - [`hospital`] -- Hospital detail records
//! - [`emergency`] -- Submission, triage, status and reconciled state types

pub mod emergency;
pub mod enums;
pub mod geo;
pub mod hospital;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use emergency::{
    AgentActivity, EmergencyReport, EmergencyState, NotifyAck, NotifyRequest, StatusPayload,
    TriageResult,
};
pub use enums::{EmergencyStatus, Severity};
pub use geo::{Coordinates, SimPosition};
pub use hospital::HospitalDetail;
pub use ids::{EmergencyId, HospitalId};
