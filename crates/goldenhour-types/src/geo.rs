//! Geographic coordinates and simulated positions.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinates {
    /// Latitude, -90 to 90.
    pub lat: f64,
    /// Longitude, -180 to 180.
    pub lng: f64,
}

impl Coordinates {
    /// Create a coordinate pair without validation.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside their ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// One frame of a simulated trip.
///
/// `progress` runs from 0 (exclusive, the start is never emitted) to 1.0
/// (the final frame, which sits exactly on the destination).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimPosition {
    /// Interpolated latitude.
    pub lat: f64,
    /// Interpolated longitude.
    pub lng: f64,
    /// Fraction of the trip completed.
    pub progress: f64,
}

impl SimPosition {
    /// The coordinate part of this frame.
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}
