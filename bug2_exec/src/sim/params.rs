//! Simulation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::SimError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters describing the simulated world and robot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Starting position of the robot in the world frame.
    ///
    /// Units: meters
    pub start_pos_m: [f64; 2],

    /// Starting yaw of the robot.
    ///
    /// Units: radians
    pub start_yaw_rad: f64,

    /// Position of the target in the world frame.
    ///
    /// Units: meters
    pub target_pos_m: [f64; 2],

    /// Radius of the drive wheels.
    ///
    /// Units: meters
    pub wheel_radius_m: f64,

    /// Distance between the left and right wheels.
    ///
    /// Units: meters
    pub axle_length_m: f64,

    /// Maximum distance at which a sonar detects an obstacle.
    ///
    /// Units: meters
    pub sonar_range_m: f64,

    /// Obstacles in the world.
    pub obstacles: Vec<CircleObstacle>
}

/// A circular obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleObstacle {
    /// Units: meters
    pub centre_m: [f64; 2],

    /// Units: meters
    pub radius_m: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    /// A Pioneer 3-DX sized robot at the origin facing +X, with no obstacles.
    fn default() -> Self {
        Self {
            start_pos_m: [0.0, 0.0],
            start_yaw_rad: 0.0,
            target_pos_m: [4.0, 0.0],
            wheel_radius_m: 0.0975,
            axle_length_m: 0.331,
            sonar_range_m: 5.0,
            obstacles: Vec::new()
        }
    }
}

impl SimParams {
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.wheel_radius_m > 0.0) || !(self.axle_length_m > 0.0) {
            return Err(SimError::InvalidParams(
                "wheel radius and axle length must be positive".into()
            ))
        }

        if !(self.sonar_range_m > 0.0) {
            return Err(SimError::InvalidParams(format!(
                "sonar range must be positive, found {} m", self.sonar_range_m
            )))
        }

        for (i, obs) in self.obstacles.iter().enumerate() {
            if !(obs.radius_m > 0.0) {
                return Err(SimError::InvalidParams(format!(
                    "obstacle {} has non-positive radius {} m", i, obs.radius_m
                )))
            }
        }

        Ok(())
    }
}

impl CircleObstacle {
    pub fn new(centre_m: [f64; 2], radius_m: f64) -> Self {
        Self { centre_m, radius_m }
    }
}
