//! Duplicate suppression for the active hazard set

use crate::types::Hazard;

/// Two hazards of the same type closer than this are the same road feature
pub const DEFAULT_DEDUP_RADIUS_M: f64 = 100.0;

/// Whether `candidate` repeats a hazard already in `existing`
pub fn is_duplicate(existing: &[Hazard], candidate: &Hazard, radius_m: f64) -> bool {
    existing.iter().any(|h| {
        h.id == candidate.id
            || (h.hazard_type == candidate.hazard_type
                && h.location.distance_m(&candidate.location) < radius_m)
    })
}
