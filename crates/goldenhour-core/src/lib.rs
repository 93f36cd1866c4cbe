//! Emergency lifecycle reconciliation engine for the Golden Hour tracker.
//!
//! This crate turns a stream of status polls into one reconciled view per
//! emergency: it detects hospital assignment, merges hospital detail exactly
//! once, and tells subscribers when each session ends. It also simulates
//! the ambulance trip once a hospital is known.
//!
//! # Modules
//!
//! - [`config`] -- Engine configuration from environment variables.
//! - [`error`] -- [`TrackerError`] and [`SimulationError`].
//! - [`events`] -- [`TrackerEvent`] published to subscribers.
//! - [`normalize`] -- Hospital response normalization and selection.
//! - [`poller`] -- [`StatusPoller`] sessions, one task per emergency.
//! - [`reconciler`] -- Per-session [`Reconciler`] state machine.
//! - [`simulator`] -- [`PositionSimulator`] and timed simulations.
//! - [`tracker`] -- The [`Tracker`] facade.
//!
//! [`TrackerError`]: error::TrackerError
//! [`SimulationError`]: error::SimulationError
//! [`TrackerEvent`]: events::TrackerEvent
//! [`StatusPoller`]: poller::StatusPoller
//! [`Reconciler`]: reconciler::Reconciler
//! [`PositionSimulator`]: simulator::PositionSimulator
//! [`Tracker`]: tracker::Tracker

pub mod config;
pub mod error;
pub mod events;
pub mod normalize;
pub mod poller;
pub mod reconciler;
pub mod simulator;
pub mod tracker;

pub use config::{PollConfig, SimConfig, TrackerConfig};
pub use error::{FailureKind, SimulationError, TrackerError};
pub use events::{SessionOutcome, TrackerEvent};
pub use normalize::normalize_hospitals;
pub use poller::{PollPhase, Progress, Snapshot, StatusPoller};
pub use reconciler::{Assignment, Reconciled, Reconciler};
pub use simulator::{Frames, PositionSimulator, SimEvent, Simulation, SimulationHandle};
pub use tracker::{Tracker, Tracking};
