//! Hospital response normalization.
//!
//! The hospital-detail endpoint has answered with several shapes over time:
//!
//! - a bare array of hospitals
//! - `{ "hospitals": [...] }`
//! - `{ "data": [...] }`
//! - `{ "hospital": {...} }`
//! - a bare hospital object
//!
//! [`normalize_hospitals`] folds all of them into one ordered list.
//! Entries that do not parse as a hospital are skipped.

use goldenhour_types::{HospitalDetail, HospitalId, StatusPayload};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Normalize any known response shape into an ordered hospital list.
///
/// Unknown shapes yield an empty list.
pub fn normalize_hospitals(raw: &Value) -> Vec<HospitalDetail> {
    match raw {
        Value::Array(items) => parse_list(items),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("hospitals") {
                parse_list(items)
            } else if let Some(Value::Array(items)) = map.get("data") {
                parse_list(items)
            } else if let Some(inner @ Value::Object(_)) = map.get("hospital") {
                parse_one(inner).into_iter().collect()
            } else {
                parse_one(raw).into_iter().collect()
            }
        }
        _ => Vec::new(),
    }
}

fn parse_list(items: &[Value]) -> Vec<HospitalDetail> {
    items.iter().filter_map(parse_one).collect()
}

fn parse_one(value: &Value) -> Option<HospitalDetail> {
    match HospitalDetail::deserialize(value) {
        Ok(detail) => Some(detail),
        Err(err) => {
            debug!(error = %err, "skipping malformed hospital entry");
            None
        }
    }
}

/// What a status payload says about the assigned hospital.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentHint {
    /// The payload carries the full hospital inline.
    Inline(HospitalDetail),
    /// The payload names the hospital by id only.
    Reference(HospitalId),
    /// Assignment is signalled without naming a hospital.
    Unnamed,
}

/// Extract the assignment hint from a payload that signals assignment.
///
/// An inline object under `hospital` wins over one under
/// `assignedHospital`; a bare id (string or number, or an object holding
/// only an `id`) becomes a reference.
pub fn assignment_hint(payload: &StatusPayload) -> AssignmentHint {
    let candidates = [payload.hospital.as_ref(), payload.assigned_hospital.as_ref()];
    for value in candidates.into_iter().flatten() {
        if value.is_object()
            && let Ok(detail) = HospitalDetail::deserialize(value)
        {
            return AssignmentHint::Inline(detail);
        }
    }

    payload
        .assigned_hospital
        .as_ref()
        .or(payload.hospital.as_ref())
        .and_then(reference_id)
        .map_or(AssignmentHint::Unnamed, AssignmentHint::Reference)
}

fn reference_id(value: &Value) -> Option<HospitalId> {
    let id = match value {
        Value::Object(map) => map.get("id")?,
        other => other,
    };
    match id {
        Value::String(s) if !s.is_empty() => Some(HospitalId::new(s.as_str())),
        Value::Number(n) => Some(HospitalId::new(n.to_string())),
        _ => None,
    }
}

/// Choose the assigned hospital from a normalized list.
///
/// Preference: the hospital matching `reference`, then the recommended
/// one, then the first.
pub fn select_hospital(
    hospitals: Vec<HospitalDetail>,
    reference: Option<&HospitalId>,
) -> Option<HospitalDetail> {
    let by_reference = reference.and_then(|id| hospitals.iter().position(|h| &h.id == id));
    let index = by_reference
        .or_else(|| hospitals.iter().position(|h| h.is_recommended))
        .unwrap_or(0);
    hospitals.into_iter().nth(index)
}
