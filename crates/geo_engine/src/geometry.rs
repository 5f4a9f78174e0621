//! Great-circle distance and delivery-area bounding boxes.

/// Mean Earth radius used by [`distance_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Rough km per degree of latitude.
const KM_PER_DEGREE: f64 = 111.0;

/// Keeps the longitude span finite at the poles.
const POLE_EPSILON: f64 = 1e-6;

/// Haversine distance in km between two (lat, lon) points in degrees.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` slightly outside [0, 1] for antipodal points.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Axis-aligned box in degrees, laid out as (lon, lat) like the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

/// Rectangle enclosing the circle of `radius_km` around (lat, lon).
///
/// Over-approximates the circle: corners may admit points farther than
/// `radius_km`, so callers must still check [`distance_km`].
pub fn bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let delta_lat = radius_km / KM_PER_DEGREE;
    let delta_lon = radius_km / (KM_PER_DEGREE * lat.to_radians().cos() + POLE_EPSILON);
    BoundingBox {
        min_lon: lon - delta_lon,
        min_lat: lat - delta_lat,
        max_lon: lon + delta_lon,
        max_lat: lat + delta_lat,
    }
}
