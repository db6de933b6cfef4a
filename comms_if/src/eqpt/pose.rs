//! # Pose source interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector3;

use crate::CommsError;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Provides the positions of the robot and its target, and the robot's yaw.
///
/// Positions are in the world frame in meters. Yaw is the rotation of the robot about the
/// vertical (world Z) axis in radians, with zero yaw facing along world X.
pub trait PoseSource {
    /// Position of the navigation target.
    fn target_position(&mut self) -> Result<Vector3<f64>, CommsError>;

    /// Position of the robot.
    fn robot_position(&mut self) -> Result<Vector3<f64>, CommsError>;

    /// Yaw of the robot.
    fn robot_yaw(&mut self) -> Result<f64, CommsError>;
}
