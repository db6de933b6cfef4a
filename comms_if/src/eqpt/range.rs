//! # Range sensor interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::CommsError;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of proximity sensors in the ring.
pub const NUM_RANGE_SENSORS: usize = 16;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single proximity sensor reading.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeReading {
    /// Distance to the detected object.
    ///
    /// Units: meters
    pub distance_m: f64,

    /// True if the sensor detected an object. If false `distance_m` is meaningless.
    pub detected: bool,
}

/// One reading from every sensor in the ring, index 0 being sensor 1.
pub type RangeSweep = [RangeReading; NUM_RANGE_SENSORS];

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A fixed ring of proximity sensors.
///
/// The ordering of the returned readings matches the physical sensor numbering. Which sensors face
/// forwards or to the flanks is configuration of the consumer, not of this interface.
pub trait RangeSensorArray {
    /// Read all sensors.
    fn read_all(&mut self) -> Result<RangeSweep, CommsError>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RangeReading {
    /// A reading with nothing detected.
    pub fn clear() -> Self {
        Self {
            distance_m: 0.0,
            detected: false,
        }
    }

    /// A reading with an object detected at the given distance.
    pub fn detected(distance_m: f64) -> Self {
        Self {
            distance_m,
            detected: true,
        }
    }

    /// Build a reading from a detected point expressed in the sensor's own frame.
    ///
    /// The distance is the length of the vector to the point.
    pub fn from_detected_point(detected: bool, point_m_s: &Vector3<f64>) -> Self {
        Self {
            distance_m: point_m_s.norm(),
            detected,
        }
    }
}

impl Default for RangeReading {
    fn default() -> Self {
        Self::clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_detected_point() {
        let r = RangeReading::from_detected_point(true, &Vector3::new(0.3, 0.0, 0.4));
        assert!(r.detected);
        assert!((r.distance_m - 0.5).abs() < 1e-12);

        let r = RangeReading::from_detected_point(false, &Vector3::zeros());
        assert!(!r.detected);
    }
}
