//! # Pose and heading resolution

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use std::f64::consts::FRAC_PI_2;
use util::quat::{make_quaternion, rotate, rotate_about_z, x_axis, z_axis};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the unit heading vector of a robot with the given yaw.
pub fn heading_from_yaw(yaw_rad: f64) -> Vector3<f64> {
    rotate(&make_quaternion(yaw_rad, &z_axis()), &x_axis())
}

/// Get the vector from the robot to the target, flattened onto the XY plane.
pub fn planar_target_vector(
    robot_pos_m: &Vector3<f64>,
    target_pos_m: &Vector3<f64>
) -> Vector3<f64> {
    Vector3::new(
        target_pos_m[0] - robot_pos_m[0],
        target_pos_m[1] - robot_pos_m[1],
        0.0
    )
}

/// The heading a quarter turn counter-clockwise from the given one.
pub fn quarter_turn_ccw(heading: &Vector3<f64>) -> Vector3<f64> {
    rotate_about_z(heading, FRAC_PI_2)
}
