//! Follow one poll session on the console.

use std::process::ExitCode;

use futures::StreamExt;
use goldenhour_client::EmergencyApi;
use goldenhour_core::{SessionOutcome, Tracker, TrackerEvent};
use goldenhour_types::{Coordinates, EmergencyStatus, HospitalDetail};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cli::RunOptions;

/// Log the events of session `generation` until it ends.
///
/// When a hospital with a known location is assigned and `patient` is
/// known, an ambulance trip from the hospital to the patient is simulated
/// alongside. Returns `None` if the event channel closed first.
pub async fn follow<A: EmergencyApi>(
    tracker: &Tracker<A>,
    mut events: broadcast::Receiver<TrackerEvent>,
    generation: u64,
    patient: Option<Coordinates>,
    options: RunOptions,
) -> Option<SessionOutcome> {
    let mut ambulance: Option<JoinHandle<()>> = None;

    let outcome = loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "console fell behind, events dropped");
                continue;
            }
            Err(RecvError::Closed) => break None,
        };
        if event.generation() != generation {
            continue;
        }

        match event {
            TrackerEvent::StateUpdated { state, .. } => {
                let activity = state.agent_activity.as_ref();
                info!(
                    emergency_id = %state.emergency_id,
                    status = %state.status,
                    agent = activity.and_then(|a| a.agent_name.as_deref()),
                    message = activity.and_then(|a| a.message.as_deref()),
                    "status"
                );
            }
            TrackerEvent::HospitalAssigned { hospital, .. } => {
                info!(
                    hospital_id = %hospital.id,
                    hospital = %hospital.name,
                    eta_minutes = hospital.eta_minutes,
                    distance_km = hospital.distance_km,
                    "hospital assigned"
                );
                if options.simulate && ambulance.is_none() {
                    ambulance = dispatch(tracker, &hospital, patient, options);
                }
            }
            TrackerEvent::DegradedAssignment { cause, .. } => warn!(
                error = %cause,
                kind = ?cause.kind(),
                "hospital assigned but its detail is unavailable"
            ),
            TrackerEvent::SessionEnded { outcome, .. } => break Some(outcome),
        }
    };

    if let Some(trip) = ambulance
        && let Err(e) = trip.await
    {
        warn!(error = %e, "ambulance simulation task failed");
    }
    outcome
}

/// Spawn the ambulance simulation, if both ends of the trip are known.
fn dispatch<A: EmergencyApi>(
    tracker: &Tracker<A>,
    hospital: &HospitalDetail,
    patient: Option<Coordinates>,
    options: RunOptions,
) -> Option<JoinHandle<()>> {
    let (Some(from), Some(to)) = (hospital.location(), patient) else {
        info!(hospital_id = %hospital.id, "no route to simulate, location unknown");
        return None;
    };
    let simulation = match tracker.simulate(from, to, options.trip) {
        Ok(simulation) => simulation,
        Err(e) => {
            warn!(error = %e, "cannot simulate ambulance");
            return None;
        }
    };
    info!(
        hospital_id = %hospital.id,
        steps = simulation.steps(),
        trip_ms = u64::try_from(options.trip.as_millis()).unwrap_or(u64::MAX),
        "ambulance dispatched"
    );

    Some(tokio::spawn(async move {
        let mut frames = Box::pin(simulation.into_stream());
        while let Some(frame) = frames.next().await {
            let at = frame.position();
            if frame.is_arrival() {
                info!(lat = at.lat, lng = at.lng, "ambulance arrived");
            } else {
                debug!(lat = at.lat, lng = at.lng, progress = at.progress, "ambulance moved");
            }
        }
    }))
}

/// Process exit code for a finished session.
pub const fn exit_code(outcome: Option<&SessionOutcome>) -> ExitCode {
    match outcome {
        Some(
            SessionOutcome::Completed {
                status: EmergencyStatus::Assigned,
            }
            | SessionOutcome::Stopped,
        ) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
