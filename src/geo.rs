//! Great-circle distance.
//!
//! Haversine distance between coordinate pairs, used by the comparable
//! selector's distance filter. Pure and deterministic.

use crate::types::{Coordinates, OuvcError};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinate pairs, in kilometers.
///
/// Inputs must be valid WGS-84 coordinates; out-of-range latitude or
/// longitude fails with `InvalidCoordinate`.
pub fn haversine_distance(a: Coordinates, b: Coordinates) -> Result<f64, OuvcError> {
    for c in [a, b] {
        if !c.is_valid() {
            return Err(OuvcError::InvalidCoordinate { lat: c.lat, lng: c.lng });
        }
    }

    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    Ok(EARTH_RADIUS_KM * c)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
