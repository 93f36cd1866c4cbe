//! Lifecycle reconciliation.
//!
//! A [`Reconciler`] owns the [`EmergencyState`] of one poll session and
//! folds every status payload into it. When a payload first signals
//! assignment it resolves the hospital exactly once: from the payload when
//! the hospital is inline, otherwise through one retried hospital-detail
//! fetch. Success yields [`Assignment::Assigned`]; any failure still marks
//! the emergency `ASSIGNED` and yields [`Assignment::Degraded`].

use std::sync::Arc;

use chrono::Utc;
use goldenhour_client::{EmergencyApi, RetryPolicy, with_retry};
use goldenhour_types::{EmergencyState, EmergencyStatus, HospitalDetail, StatusPayload};
use tracing::{info, warn};

use crate::error::TrackerError;
use crate::normalize::{AssignmentHint, assignment_hint, normalize_hospitals, select_hospital};

/// One-time assignment outcome produced by a reconciliation step.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// Hospital detail was merged.
    Assigned(Arc<HospitalDetail>),
    /// Assignment confirmed without detail.
    Degraded(TrackerError),
}

/// Result of folding one payload into the session state.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// The new state.
    pub state: Arc<EmergencyState>,
    /// Set on the step that resolved the assignment, and only then.
    pub assignment: Option<Assignment>,
}

/// Per-session reconciliation state.
#[derive(Debug)]
pub struct Reconciler {
    state: Arc<EmergencyState>,
    detail_policy: RetryPolicy,
    assignment_resolved: bool,
}

impl Reconciler {
    /// Start reconciling from `initial`.
    ///
    /// `detail_policy` governs the single hospital-detail fetch.
    pub fn new(initial: EmergencyState, detail_policy: RetryPolicy) -> Self {
        let assignment_resolved = initial.assigned_hospital.is_some();
        Self {
            state: Arc::new(initial),
            detail_policy,
            assignment_resolved,
        }
    }

    /// The current state.
    pub const fn state(&self) -> &Arc<EmergencyState> {
        &self.state
    }

    /// Whether the assignment has been resolved (merged or degraded).
    pub const fn assignment_resolved(&self) -> bool {
        self.assignment_resolved
    }

    /// Fold `payload` into the state, fetching hospital detail if needed.
    pub async fn reconcile<A: EmergencyApi>(
        &mut self,
        api: &A,
        payload: &StatusPayload,
    ) -> Reconciled {
        let mut next = merge_fields(&self.state, payload);

        let mut assignment = None;
        if next.status != EmergencyStatus::Error && payload.signals_assignment() {
            next.status = EmergencyStatus::Assigned;
            if !self.assignment_resolved {
                self.assignment_resolved = true;
                let resolved = self.resolve_hospital(api, payload).await;
                assignment = Some(match resolved {
                    Ok(hospital) => {
                        info!(
                            emergency_id = %next.emergency_id,
                            hospital_id = %hospital.id,
                            hospital = %hospital.name,
                            "hospital assigned"
                        );
                        let hospital = Arc::new(hospital);
                        next.assigned_hospital = Some(HospitalDetail::clone(&hospital));
                        Assignment::Assigned(hospital)
                    }
                    Err(cause) => {
                        warn!(
                            emergency_id = %next.emergency_id,
                            error = %cause,
                            "assignment confirmed without hospital detail"
                        );
                        Assignment::Degraded(cause)
                    }
                });
            }
        }

        next.last_updated = Utc::now();
        self.state = Arc::new(next);
        Reconciled {
            state: Arc::clone(&self.state),
            assignment,
        }
    }

    /// Mark the emergency failed after a non-retryable error.
    ///
    /// A state that already holds a hospital is left untouched.
    pub fn fail(&mut self) -> Arc<EmergencyState> {
        if self.state.assigned_hospital.is_none() {
            let mut next = EmergencyState::clone(&self.state);
            next.status = EmergencyStatus::Error;
            next.last_updated = Utc::now();
            self.state = Arc::new(next);
        }
        Arc::clone(&self.state)
    }

    async fn resolve_hospital<A: EmergencyApi>(
        &self,
        api: &A,
        payload: &StatusPayload,
    ) -> Result<HospitalDetail, TrackerError> {
        let reference = match assignment_hint(payload) {
            AssignmentHint::Inline(detail) => return Ok(detail),
            AssignmentHint::Reference(id) => Some(id),
            AssignmentHint::Unnamed => None,
        };

        let emergency_id = &self.state.emergency_id;
        let raw = with_retry(&self.detail_policy, move |_| {
            api.get_hospital_detail(emergency_id)
        })
        .await?;
        select_hospital(normalize_hospitals(&raw), reference.as_ref())
            .ok_or(TrackerError::NoHospitalDetail)
    }
}

/// Copy every field the payload carries over the held state.
///
/// Absent fields keep their previous value. Once a hospital is attached the
/// status stays `ASSIGNED`.
fn merge_fields(current: &EmergencyState, payload: &StatusPayload) -> EmergencyState {
    let mut next = current.clone();
    if current.assigned_hospital.is_none()
        && let Some(status) = payload.status
    {
        next.status = status;
    }
    if payload.severity.is_some() {
        next.severity = payload.severity;
    }
    if payload.recommended_specialty.is_some() {
        next.recommended_specialty.clone_from(&payload.recommended_specialty);
    }
    if payload.estimated_response_time.is_some() {
        next.estimated_response_time = payload.estimated_response_time;
    }
    if !payload.activity.is_empty() {
        next.agent_activity = Some(payload.activity.clone());
    }
    next
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use goldenhour_client::{Operation, TransportError};
    use goldenhour_types::{
        EmergencyId, EmergencyReport, NotifyAck, NotifyRequest, Severity, TriageResult,
    };
    use serde_json::{Value, json};

    use super::*;

    /// Serves hospital detail from a fixed script of results.
    struct DetailOnly {
        responses: Mutex<Vec<Result<Value, TransportError>>>,
        calls: AtomicU32,
    }

    impl DetailOnly {
        fn new(mut responses: Vec<Result<Value, TransportError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: AtomicU32::new(0),
            }
        }
    }

    fn unused(operation: Operation) -> TransportError {
        TransportError::Unknown {
            operation,
            message: "not scripted".to_owned(),
        }
    }

    impl EmergencyApi for DetailOnly {
        async fn submit_emergency(
            &self,
            _report: &EmergencyReport,
        ) -> Result<TriageResult, TransportError> {
            Err(unused(Operation::SubmitEmergency))
        }

        async fn get_status(&self, _id: &EmergencyId) -> Result<StatusPayload, TransportError> {
            Err(unused(Operation::GetStatus))
        }

        async fn get_hospital_detail(&self, _id: &EmergencyId) -> Result<Value, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .map_err(|_poisoned| unused(Operation::GetHospitalDetail))?
                .pop()
                .unwrap_or_else(|| Err(unused(Operation::GetHospitalDetail)))
        }

        async fn notify_hospital(&self, _req: &NotifyRequest) -> Result<NotifyAck, TransportError> {
            Err(unused(Operation::NotifyHospital))
        }
    }

    fn payload(json: Value) -> StatusPayload {
        serde_json::from_value(json).unwrap_or_default()
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(
            EmergencyState::unknown(EmergencyId::new("e-1")),
            RetryPolicy::fixed(3, Duration::from_millis(10)),
        )
    }

    fn fault() -> TransportError {
        TransportError::ServerFault {
            operation: Operation::GetHospitalDetail,
            status: 502,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn processing_payload_merges_fields_only() {
        let api = DetailOnly::new(Vec::new());
        let mut rec = reconciler();
        let out = rec
            .reconcile(
                &api,
                &payload(json!({
                    "status": "PROCESSING",
                    "severity": "critical",
                    "agentName": "Triage Agent",
                    "message": "Assessing vitals"
                })),
            )
            .await;
        assert_eq!(out.state.status, EmergencyStatus::Processing);
        assert_eq!(out.state.severity, Some(Severity::Critical));
        assert_eq!(
            out.state.agent_activity.as_ref().and_then(|a| a.message.as_deref()),
            Some("Assessing vitals")
        );
        assert_eq!(out.assignment, None);
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reference_triggers_one_fetch_and_selects_match() {
        let api = DetailOnly::new(vec![Ok(json!({"hospitals": [
            {"id": "a", "name": "A", "isRecommended": true},
            {"id": "b", "name": "B", "latitude": 28.6, "longitude": 77.2}
        ]}))]);
        let mut rec = reconciler();
        let first = rec
            .reconcile(&api, &payload(json!({"status": "PROCESSING", "assignedHospital": "b"})))
            .await;
        assert_eq!(first.state.status, EmergencyStatus::Assigned);
        assert_eq!(
            first.state.assigned_hospital.as_ref().map(|h| h.id.as_str()),
            Some("b")
        );
        assert!(matches!(first.assignment, Some(Assignment::Assigned(_))));
        assert!(first.state.is_consistent());

        let second = rec
            .reconcile(&api, &payload(json!({"status": "ASSIGNED", "assignedHospital": "b"})))
            .await;
        assert_eq!(second.assignment, None);
        assert_eq!(second.state.assigned_hospital, first.state.assigned_hospital);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn inline_hospital_is_adopted_without_fetch() {
        let api = DetailOnly::new(Vec::new());
        let mut rec = reconciler();
        let out = rec
            .reconcile(
                &api,
                &payload(json!({"hospital": {"id": "h9", "name": "Harbor", "eta": 6}})),
            )
            .await;
        assert_eq!(
            out.state.assigned_hospital.as_ref().and_then(|h| h.eta_minutes),
            Some(6)
        );
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_degrades_once() {
        let api = DetailOnly::new(vec![Err(fault()), Err(fault()), Err(fault())]);
        let mut rec = reconciler();
        let first = rec
            .reconcile(&api, &payload(json!({"status": "ASSIGNED"})))
            .await;
        assert!(first.state.is_degraded());
        assert_eq!(
            first.assignment,
            Some(Assignment::Degraded(TrackerError::RetryExhausted {
                attempts: 3,
                last: fault()
            }))
        );

        let again = rec
            .reconcile(&api, &payload(json!({"status": "ASSIGNED"})))
            .await;
        assert_eq!(again.assignment, None);
        assert!(again.state.is_degraded());
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_detail_response_degrades() {
        let api = DetailOnly::new(vec![Ok(json!({"hospitals": []}))]);
        let mut rec = reconciler();
        let out = rec
            .reconcile(&api, &payload(json!({"status": "ASSIGNED"})))
            .await;
        assert_eq!(
            out.assignment,
            Some(Assignment::Degraded(TrackerError::NoHospitalDetail))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn error_status_wins_over_assignment_triggers() {
        let api = DetailOnly::new(Vec::new());
        let mut rec = reconciler();
        let out = rec
            .reconcile(&api, &payload(json!({"status": "ERROR", "assignedHospital": "b"})))
            .await;
        assert_eq!(out.state.status, EmergencyStatus::Error);
        assert_eq!(out.state.assigned_hospital, None);
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fail_marks_error_unless_assigned() {
        let mut rec = reconciler();
        assert_eq!(rec.fail().status, EmergencyStatus::Error);

        let mut assigned = EmergencyState::unknown(EmergencyId::new("e-2"));
        assigned.status = EmergencyStatus::Assigned;
        assigned.assigned_hospital = Some(HospitalDetail::new("h", "H"));
        let mut rec = Reconciler::new(assigned, RetryPolicy::one_shot());
        assert!(rec.assignment_resolved());
        assert_eq!(rec.fail().status, EmergencyStatus::Assigned);
    }
}
