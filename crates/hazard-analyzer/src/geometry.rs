//! Geometry helpers over location fixes

use signal_buffer::Coordinate;

/// Meters per second to miles per hour
pub const MPS_TO_MPH: f64 = 2.236_936;

/// Smallest absolute difference between two headings (degrees, 0-180)
pub fn bearing_delta_deg(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

/// Radius (m) of the circle through three points (Menger curvature).
///
/// Side lengths are great-circle distances and the area comes from Heron's
/// formula. Collinear points, or any side shorter than `min_segment_m`,
/// give an infinite radius.
pub fn turn_radius_m(p1: &Coordinate, p2: &Coordinate, p3: &Coordinate, min_segment_m: f64) -> f64 {
    let a = p1.distance_m(p2);
    let b = p2.distance_m(p3);
    let c = p1.distance_m(p3);

    if a < min_segment_m || b < min_segment_m || c < min_segment_m {
        return f64::INFINITY;
    }

    let s = (a + b + c) / 2.0;
    let area_sq = s * (s - a) * (s - b) * (s - c);
    if area_sq <= 0.0 {
        return f64::INFINITY;
    }

    (a * b * c) / (4.0 * area_sq.sqrt())
}
