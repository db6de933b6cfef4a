//! # Sensor clearance normalisation
//!
//! Converts raw proximity readings into clearance values in `[0, 1]`, where 1
//! means nothing is within range and 0 means an obstacle is touching the
//! sensor.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::{RangeReading, RangeSweep, NUM_RANGE_SENSORS};
use util::maths::lin_map;

use super::NavCtrlError;

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// Clearance of each sensor in the ring, index 0 being sensor 1.
pub type ClearanceArray = [f64; NUM_RANGE_SENSORS];

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the clearance of a single reading.
///
/// Readings with nothing detected or a distance beyond `max_m` are fully
/// clear. Distances below `min_m` have no clearance. Everything in between is
/// scaled linearly.
///
/// A detection with a NaN or infinite distance has no meaningful clearance,
/// so `None` is returned.
pub fn normalise_reading(reading: &RangeReading, min_m: f64, max_m: f64) -> Option<f64> {
    let dist_m = reading.distance_m;

    if !reading.detected {
        Some(1.0)
    }
    else if !dist_m.is_finite() {
        None
    }
    else if dist_m > max_m {
        Some(1.0)
    }
    else if dist_m < min_m {
        Some(0.0)
    }
    else {
        Some(lin_map((min_m, max_m), (0.0, 1.0), dist_m))
    }
}

/// Get the clearance of every sensor in a sweep.
///
/// Fails on the first sensor reporting a detection without a finite
/// distance.
pub fn normalise_sweep(
    sweep: &RangeSweep,
    min_m: f64,
    max_m: f64
) -> Result<ClearanceArray, NavCtrlError> {
    let mut clearance = [1.0; NUM_RANGE_SENSORS];

    for (i, (c, reading)) in clearance.iter_mut().zip(sweep.iter()).enumerate() {
        *c = normalise_reading(reading, min_m, max_m)
            .ok_or(NavCtrlError::InvalidReading {
                sensor: i + 1,
                distance_m: reading.distance_m
            })?;
    }

    Ok(clearance)
}
