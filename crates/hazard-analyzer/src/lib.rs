//! Hazard Pattern Analyzer
//!
//! Derives road-hazard candidates from the rider's recent location fixes:
//! - Poor road surface (speed jitter with frequent heading changes)
//! - Sharp turns (Menger curvature over three fixes)
//! - Sudden speed changes
//!
//! and promotes nearby, trusted crowd-sourced reports into hazards.

mod analyzer;
mod dedup;
mod geometry;
mod types;

pub use analyzer::{HazardAnalyzer, HazardConfig};
pub use dedup::{is_duplicate, DEFAULT_DEDUP_RADIUS_M};
pub use geometry::{bearing_delta_deg, turn_radius_m, MPS_TO_MPH};
pub use types::{CrowdSourcedReport, Hazard, HazardSource, HazardType, Severity};
