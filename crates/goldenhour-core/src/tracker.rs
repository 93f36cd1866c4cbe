//! The tracker facade.
//!
//! [`Tracker`] is what a dashboard holds: one-shot calls (submit, notify,
//! hospital list) with the one-shot retry policy, poll session control,
//! event subscription and ambulance simulation, all behind one value.

use std::time::Duration;

use goldenhour_client::{ConfigError, EmergencyApi, HttpTransport, RetryPolicy, with_retry};
use goldenhour_types::{
    Coordinates, EmergencyId, EmergencyReport, EmergencyState, HospitalDetail, HospitalId,
    NotifyAck, NotifyRequest, TriageResult,
};
use tokio::sync::broadcast;
use tracing::info;

use crate::config::TrackerConfig;
use crate::error::{SimulationError, TrackerError};
use crate::events::TrackerEvent;
use crate::normalize::normalize_hospitals;
use crate::poller::{PollPhase, Snapshot, StatusPoller};
use crate::simulator::{PositionSimulator, Simulation};

/// A submitted emergency whose status is being tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracking {
    /// Triage result returned by the submit call.
    pub triage: TriageResult,
    /// Generation of the poll session that tracks it.
    pub generation: u64,
}

/// Submit, track and follow emergencies.
pub struct Tracker<A> {
    poller: StatusPoller<A>,
    one_shot: RetryPolicy,
    simulator: PositionSimulator,
}

impl Tracker<HttpTransport> {
    /// Tracker talking HTTP to the configured backend.
    pub fn from_config(config: &TrackerConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(&config.client)?;
        Ok(Self::new(transport, config))
    }
}

impl<A: EmergencyApi> Tracker<A> {
    /// Tracker over an arbitrary transport.
    pub fn new(api: A, config: &TrackerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            poller: StatusPoller::new(api, config.poll, config.one_shot, events),
            one_shot: config.one_shot,
            simulator: PositionSimulator::new(&config.simulation),
        }
    }

    /// The underlying poller.
    pub const fn poller(&self) -> &StatusPoller<A> {
        &self.poller
    }

    /// Submit an emergency for triage.
    pub async fn submit(&self, report: &EmergencyReport) -> Result<TriageResult, TrackerError> {
        let api = self.poller.api();
        let triage = with_retry(&self.one_shot, move |_| api.submit_emergency(report)).await?;
        info!(
            emergency_id = %triage.emergency_id,
            severity = ?triage.severity,
            "emergency submitted"
        );
        Ok(triage)
    }

    /// Submit an emergency and start tracking it.
    pub async fn submit_and_track(
        &self,
        report: &EmergencyReport,
    ) -> Result<Tracking, TrackerError> {
        let triage = self.submit(report).await?;
        let generation = self.track_from(EmergencyState::submitted(&triage));
        Ok(Tracking { triage, generation })
    }

    /// Start tracking an existing emergency. Returns the session generation.
    pub fn track(&self, emergency_id: EmergencyId) -> u64 {
        self.poller.start(emergency_id, self.poller.config().interval)
    }

    /// Start tracking from a known state. Returns the session generation.
    pub fn track_from(&self, initial: EmergencyState) -> u64 {
        self.poller.start_from(initial, self.poller.config().interval)
    }

    /// Start tracking with a custom poll interval.
    pub fn track_every(&self, emergency_id: EmergencyId, interval: Duration) -> u64 {
        self.poller.start(emergency_id, interval)
    }

    /// Stop tracking. Returns `true` if a session was running.
    pub fn stop(&self, emergency_id: &EmergencyId) -> bool {
        self.poller.stop(emergency_id)
    }

    /// Release a finished emergency. Returns `false` while it is still
    /// being polled.
    pub fn forget(&self, emergency_id: &EmergencyId) -> bool {
        self.poller.forget(emergency_id)
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.poller.subscribe()
    }

    /// Latest published view of an emergency.
    pub fn snapshot(&self, emergency_id: &EmergencyId) -> Option<Snapshot> {
        self.poller.latest(emergency_id)
    }

    /// Poll session phase of an emergency.
    pub fn phase(&self, emergency_id: &EmergencyId) -> PollPhase {
        self.poller.phase(emergency_id)
    }

    /// Alert a hospital about an emergency.
    pub async fn notify_hospital(
        &self,
        hospital_id: HospitalId,
        emergency_id: EmergencyId,
    ) -> Result<NotifyAck, TrackerError> {
        let request = NotifyRequest {
            hospital_id,
            emergency_id,
        };
        let api = self.poller.api();
        let request_ref = &request;
        let ack = with_retry(&self.one_shot, move |_| api.notify_hospital(request_ref)).await?;
        info!(
            emergency_id = %request.emergency_id,
            hospital_id = %request.hospital_id,
            status = ?ack.status,
            "hospital notified"
        );
        Ok(ack)
    }

    /// Hospitals the backend considers for an emergency, normalized.
    pub async fn hospitals(
        &self,
        emergency_id: &EmergencyId,
    ) -> Result<Vec<HospitalDetail>, TrackerError> {
        let api = self.poller.api();
        let raw = with_retry(&self.one_shot, move |_| {
            api.get_hospital_detail(emergency_id)
        })
        .await?;
        Ok(normalize_hospitals(&raw))
    }

    /// The configured position simulator.
    pub const fn simulator(&self) -> &PositionSimulator {
        &self.simulator
    }

    /// Simulate an ambulance driving from `from` to `to` over `trip`.
    pub fn simulate(
        &self,
        from: Coordinates,
        to: Coordinates,
        trip: Duration,
    ) -> Result<Simulation, SimulationError> {
        self.simulator.simulate(from, to, trip)
    }
}
