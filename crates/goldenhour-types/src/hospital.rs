//! Hospital detail records.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::Coordinates;
use crate::ids::HospitalId;

/// Full detail for a hospital, as returned by the hospital-detail endpoint.
///
/// Treated as immutable once attached to an
/// [`EmergencyState`](crate::EmergencyState): a later fetch produces a new
/// state, never an in-place update. The list view of the backend uses the
/// short field names `distance` and `eta`; both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct HospitalDetail {
    /// Registry identifier.
    pub id: HospitalId,
    /// Display name.
    pub name: String,
    /// Road distance from the emergency in kilometres.
    #[serde(default)]
    #[serde(alias = "distance")]
    pub distance_km: Option<f64>,
    /// Estimated travel time in minutes.
    #[serde(default)]
    #[serde(alias = "eta")]
    pub eta_minutes: Option<u32>,
    /// Free beds at the time of the fetch.
    #[serde(default)]
    pub beds_available: Option<u32>,
    /// Clinical specialties offered.
    #[serde(default)]
    pub specialties: Vec<String>,
    /// Street address.
    #[serde(default)]
    pub address: Option<String>,
    /// Reception phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Latitude of the hospital, when the backend provides it.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude of the hospital, when the backend provides it.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Whether the routing agent recommends this hospital.
    #[serde(default)]
    pub is_recommended: bool,
}

impl HospitalDetail {
    /// Create a record with only the mandatory fields set.
    pub fn new(id: impl Into<HospitalId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            distance_km: None,
            eta_minutes: None,
            beds_available: None,
            specialties: Vec::new(),
            address: None,
            phone: None,
            latitude: None,
            longitude: None,
            is_recommended: false,
        }
    }

    /// Hospital position, if both components are present and valid.
    pub fn location(&self) -> Option<Coordinates> {
        let coords = Coordinates::new(self.latitude?, self.longitude?);
        coords.is_valid().then_some(coords)
    }
}
