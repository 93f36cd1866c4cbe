//! Status polling sessions.
//!
//! [`StatusPoller`] runs one Tokio task per tracked emergency. Each task
//! ticks on a fixed interval, fetches status through the retry controller,
//! folds the payload into its [`Reconciler`] and publishes the result.
//!
//! # Session lifecycle
//!
//! ```text
//! IDLE --start--> RUNNING --terminal status--> STOPPED
//!                    |----stop()-------------> STOPPED
//!                    |----budget exhausted---> EXPIRED
//!                    '----fatal error--------> FAILED
//! ```
//!
//! At most one session runs per emergency id. Starting a new session for
//! an id supersedes the old one: its cancel signal fires and the session
//! generation it carries no longer matches the registry, so anything it
//! computes afterwards is discarded instead of published.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use goldenhour_client::{EmergencyApi, RetryPolicy, with_retry};
use goldenhour_types::{EmergencyId, EmergencyState, EmergencyStatus, StatusPayload};
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::PollConfig;
use crate::error::TrackerError;
use crate::events::{SessionOutcome, TrackerEvent};
use crate::reconciler::{Assignment, Reconciled, Reconciler};

/// Shortest interval a session will tick at.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Phase of the poll session for one emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PollPhase {
    /// No session was ever started.
    #[default]
    Idle,
    /// Polling.
    Running,
    /// Ended on a terminal status or on request.
    Stopped,
    /// Ended because the poll budget ran out.
    Expired,
    /// Ended on a non-retryable failure.
    Failed,
}

impl PollPhase {
    /// Lower-case name for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

impl core::fmt::Display for PollPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the presentation should show for an emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Still waiting for assignment.
    Working,
    /// Assigned, with or without hospital detail.
    Done,
    /// `ERROR`, timeout or a fatal transport failure.
    Failed,
}

/// Latest published view of one emergency.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Reconciled state.
    pub state: Arc<EmergencyState>,
    /// Session phase.
    pub phase: PollPhase,
    /// Session that produced the state.
    pub generation: u64,
    /// Polls completed by that session.
    pub ticks: u32,
    /// Whether the state was observed within the freshness window.
    pub fresh: bool,
}

impl Snapshot {
    /// Presentation category of this snapshot.
    pub fn progress(&self) -> Progress {
        match (self.state.status, self.phase) {
            (EmergencyStatus::Assigned, _) => Progress::Done,
            (EmergencyStatus::Error, _) | (_, PollPhase::Expired | PollPhase::Failed) => {
                Progress::Failed
            }
            _ => Progress::Working,
        }
    }
}

/// Registry entry for one emergency.
struct Slot {
    generation: u64,
    phase: PollPhase,
    state: Arc<EmergencyState>,
    ticks: u32,
    observed_at: Instant,
    cancel: watch::Sender<bool>,
}

struct Shared<A> {
    api: A,
    config: PollConfig,
    detail_policy: RetryPolicy,
    sessions: Mutex<BTreeMap<EmergencyId, Slot>>,
    events: broadcast::Sender<TrackerEvent>,
    next_generation: AtomicU64,
}

impl<A> Shared<A> {
    fn sessions(&self) -> MutexGuard<'_, BTreeMap<EmergencyId, Slot>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: TrackerEvent) {
        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }

    /// Publish a tick result if `generation` is still the live session.
    fn publish(
        &self,
        emergency_id: &EmergencyId,
        generation: u64,
        ticks: u32,
        reconciled: Reconciled,
    ) -> bool {
        let mut sessions = self.sessions();
        let Some(slot) = live_slot(&mut sessions, emergency_id, generation) else {
            return false;
        };
        slot.state = Arc::clone(&reconciled.state);
        slot.ticks = ticks;
        slot.observed_at = Instant::now();

        self.emit(TrackerEvent::StateUpdated {
            generation,
            state: reconciled.state,
        });
        match reconciled.assignment {
            Some(Assignment::Assigned(hospital)) => self.emit(TrackerEvent::HospitalAssigned {
                generation,
                emergency_id: emergency_id.clone(),
                hospital,
            }),
            Some(Assignment::Degraded(cause)) => self.emit(TrackerEvent::DegradedAssignment {
                generation,
                emergency_id: emergency_id.clone(),
                cause,
            }),
            None => {}
        }
        true
    }

    /// Record how a live session ended.
    fn finish(
        &self,
        emergency_id: &EmergencyId,
        generation: u64,
        ticks: u32,
        outcome: SessionOutcome,
        final_state: Option<Arc<EmergencyState>>,
    ) {
        let mut sessions = self.sessions();
        let Some(slot) = live_slot(&mut sessions, emergency_id, generation) else {
            return;
        };
        slot.phase = outcome.phase();
        slot.ticks = ticks;
        if let Some(state) = final_state {
            slot.state = Arc::clone(&state);
            slot.observed_at = Instant::now();
            self.emit(TrackerEvent::StateUpdated { generation, state });
        }

        match &outcome {
            SessionOutcome::Expired { ticks } => warn!(
                emergency_id = %emergency_id,
                generation,
                ticks,
                "poll session expired without a terminal status"
            ),
            SessionOutcome::Failed { error } => warn!(
                emergency_id = %emergency_id,
                generation,
                error = %error,
                "poll session failed"
            ),
            SessionOutcome::Completed { status } => info!(
                emergency_id = %emergency_id,
                generation,
                ticks,
                status = %status,
                "poll session reached terminal status"
            ),
            SessionOutcome::Stopped => {}
        }

        self.emit(TrackerEvent::SessionEnded {
            generation,
            emergency_id: emergency_id.clone(),
            outcome,
        });
    }
}

/// The slot for `emergency_id` if `generation` is its running session.
fn live_slot<'a>(
    sessions: &'a mut BTreeMap<EmergencyId, Slot>,
    emergency_id: &EmergencyId,
    generation: u64,
) -> Option<&'a mut Slot> {
    sessions
        .get_mut(emergency_id)
        .filter(|slot| slot.generation == generation && slot.phase == PollPhase::Running)
}

/// Polls emergency status, one session per emergency id.
pub struct StatusPoller<A> {
    shared: Arc<Shared<A>>,
}

impl<A> Clone for StatusPoller<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A: EmergencyApi> StatusPoller<A> {
    /// Create a poller publishing to `events`.
    ///
    /// `detail_policy` governs the hospital-detail fetch made on assignment.
    pub fn new(
        api: A,
        config: PollConfig,
        detail_policy: RetryPolicy,
        events: broadcast::Sender<TrackerEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                config,
                detail_policy,
                sessions: Mutex::new(BTreeMap::new()),
                events,
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// The transport sessions poll through.
    pub fn api(&self) -> &A {
        &self.shared.api
    }

    /// The polling configuration.
    pub fn config(&self) -> &PollConfig {
        &self.shared.config
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.shared.events.subscribe()
    }

    /// Start polling `emergency_id` every `interval`, knowing nothing else
    /// about it. Returns the session generation.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, emergency_id: EmergencyId, interval: Duration) -> u64 {
        self.start_from(EmergencyState::unknown(emergency_id), interval)
    }

    /// Start polling from a known initial state. Returns the session
    /// generation.
    ///
    /// Any running session for the same emergency is superseded.
    pub fn start_from(&self, initial: EmergencyState, interval: Duration) -> u64 {
        let interval = interval.max(MIN_INTERVAL);
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        let emergency_id = initial.emergency_id.clone();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let previous = self.shared.sessions().insert(
            emergency_id.clone(),
            Slot {
                generation,
                phase: PollPhase::Running,
                state: Arc::new(initial.clone()),
                ticks: 0,
                observed_at: Instant::now(),
                cancel: cancel_tx,
            },
        );
        if let Some(previous) = previous
            && previous.phase == PollPhase::Running
        {
            previous.cancel.send_replace(true);
            debug!(
                emergency_id = %emergency_id,
                superseded = previous.generation,
                generation,
                "previous poll session superseded"
            );
        }

        info!(
            emergency_id = %emergency_id,
            generation,
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "poll session started"
        );

        tokio::spawn(run_session(
            Arc::clone(&self.shared),
            emergency_id,
            generation,
            interval,
            cancel_rx,
            initial,
        ));
        generation
    }

    /// Stop the running session for `emergency_id`.
    ///
    /// Returns `true` if a session was running. Stopping an emergency that
    /// is not being polled does nothing.
    pub fn stop(&self, emergency_id: &EmergencyId) -> bool {
        let mut sessions = self.shared.sessions();
        let Some(slot) = sessions
            .get_mut(emergency_id)
            .filter(|slot| slot.phase == PollPhase::Running)
        else {
            return false;
        };
        slot.phase = PollPhase::Stopped;
        slot.cancel.send_replace(true);
        let generation = slot.generation;

        info!(emergency_id = %emergency_id, generation, "poll session stopped");
        self.shared.emit(TrackerEvent::SessionEnded {
            generation,
            emergency_id: emergency_id.clone(),
            outcome: SessionOutcome::Stopped,
        });
        true
    }

    /// Drop everything held for a finished session of `emergency_id`.
    ///
    /// Returns `true` if an entry was removed. A running session is left
    /// alone; stop it first.
    pub fn forget(&self, emergency_id: &EmergencyId) -> bool {
        let mut sessions = self.shared.sessions();
        if sessions
            .get(emergency_id)
            .is_none_or(|slot| slot.phase == PollPhase::Running)
        {
            return false;
        }
        sessions.remove(emergency_id);
        debug!(emergency_id = %emergency_id, "poll session forgotten");
        true
    }

    /// Latest published view of `emergency_id`, if it was ever tracked.
    pub fn latest(&self, emergency_id: &EmergencyId) -> Option<Snapshot> {
        let stale_after = self.shared.config.stale_after;
        self.shared.sessions().get(emergency_id).map(|slot| Snapshot {
            state: Arc::clone(&slot.state),
            phase: slot.phase,
            generation: slot.generation,
            ticks: slot.ticks,
            fresh: slot.observed_at.elapsed() < stale_after,
        })
    }

    /// Session phase for `emergency_id`.
    pub fn phase(&self, emergency_id: &EmergencyId) -> PollPhase {
        self.shared
            .sessions()
            .get(emergency_id)
            .map_or(PollPhase::Idle, |slot| slot.phase)
    }

    /// Number of sessions currently polling.
    pub fn running(&self) -> usize {
        self.shared
            .sessions()
            .values()
            .filter(|slot| slot.phase == PollPhase::Running)
            .count()
    }
}

/// Body of one poll session task.
async fn run_session<A: EmergencyApi>(
    shared: Arc<Shared<A>>,
    emergency_id: EmergencyId,
    generation: u64,
    interval: Duration,
    mut cancel: watch::Receiver<bool>,
    initial: EmergencyState,
) {
    let max_ticks = shared.config.max_ticks;
    let deadline = Instant::now().checked_add(interval.saturating_mul(max_ticks));
    let mut reconciler = Reconciler::new(initial, shared.detail_policy);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks: u32 = 0;

    let ended = loop {
        tokio::select! {
            biased;
            _ = cancel.changed() => break None,
            _ = ticker.tick() => {}
        }

        if ticks >= max_ticks {
            break Some((SessionOutcome::Expired { ticks }, None));
        }
        ticks = ticks.saturating_add(1);
        debug!(emergency_id = %emergency_id, generation, tick = ticks, "polling status");

        // Only the status fetch counts against the budget. A payload that
        // arrived in time is always reconciled, detail fetch included.
        let fetched = tokio::select! {
            biased;
            _ = cancel.changed() => break None,
            fetched = within(deadline, fetch_status(&shared, &emergency_id)) => fetched,
        };
        let payload = match fetched {
            None => break Some((SessionOutcome::Expired { ticks }, None)),
            Some(Err(error)) => {
                let state = reconciler.fail();
                break Some((SessionOutcome::Failed { error }, Some(state)));
            }
            Some(Ok(payload)) => payload,
        };

        let reconciled = tokio::select! {
            biased;
            _ = cancel.changed() => break None,
            reconciled = reconciler.reconcile(&shared.api, &payload) => reconciled,
        };
        let status = reconciled.state.status;
        if !shared.publish(&emergency_id, generation, ticks, reconciled) {
            break None;
        }
        if status.is_terminal() {
            break Some((SessionOutcome::Completed { status }, None));
        }
    };

    match ended {
        Some((outcome, final_state)) => {
            shared.finish(&emergency_id, generation, ticks, outcome, final_state);
        }
        None => debug!(
            emergency_id = %emergency_id,
            generation,
            "poll session cancelled"
        ),
    }
}

/// Fetch status once, retrying transient failures.
async fn fetch_status<A: EmergencyApi>(
    shared: &Shared<A>,
    emergency_id: &EmergencyId,
) -> Result<StatusPayload, TrackerError> {
    let api = &shared.api;
    let payload = with_retry(&shared.config.status_retry, move |_| {
        api.get_status(emergency_id)
    })
    .await?;
    Ok(payload)
}

/// Run `future` until it completes or `deadline` passes.
///
/// The deadline wins a tie, so no new attempt starts at the deadline.
async fn within<F: Future>(deadline: Option<Instant>, future: F) -> Option<F::Output> {
    let Some(deadline) = deadline else {
        return Some(future.await);
    };
    tokio::select! {
        biased;
        () = tokio::time::sleep_until(deadline) => None,
        output = future => Some(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: EmergencyStatus, phase: PollPhase) -> Snapshot {
        let mut state = EmergencyState::unknown(EmergencyId::new("e"));
        state.status = status;
        Snapshot {
            state: Arc::new(state),
            phase,
            generation: 1,
            ticks: 0,
            fresh: true,
        }
    }

    #[test]
    fn progress_categories() {
        assert_eq!(
            snapshot(EmergencyStatus::Processing, PollPhase::Running).progress(),
            Progress::Working
        );
        assert_eq!(
            snapshot(EmergencyStatus::Assigned, PollPhase::Stopped).progress(),
            Progress::Done
        );
        assert_eq!(
            snapshot(EmergencyStatus::Error, PollPhase::Stopped).progress(),
            Progress::Failed
        );
        assert_eq!(
            snapshot(EmergencyStatus::Processing, PollPhase::Expired).progress(),
            Progress::Failed
        );
        assert_eq!(
            snapshot(EmergencyStatus::Submitted, PollPhase::Stopped).progress(),
            Progress::Working
        );
    }

    #[test]
    fn phase_names() {
        assert_eq!(PollPhase::default(), PollPhase::Idle);
        assert_eq!(PollPhase::Expired.to_string(), "expired");
    }
}
