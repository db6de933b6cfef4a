//! # Wheel motor interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::CommsError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Wheel velocity demands for a differential drive robot.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelDems {
    /// Left wheel angular velocity.
    ///
    /// Units: radians/second
    pub left_rads: f64,

    /// Right wheel angular velocity.
    ///
    /// Units: radians/second
    pub right_rads: f64,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The left and right wheel motors of a differential drive robot.
pub trait MotorActuator {
    /// Set the target velocity of both wheels, in radians/second.
    fn set_wheel_velocities(&mut self, left_rads: f64, right_rads: f64) -> Result<(), CommsError>;

    /// Stop both wheels.
    fn stop(&mut self) -> Result<(), CommsError> {
        self.send_demands(&WheelDems::stop())
    }

    /// Send a set of wheel demands.
    fn send_demands(&mut self, dems: &WheelDems) -> Result<(), CommsError> {
        self.set_wheel_velocities(dems.left_rads, dems.right_rads)
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WheelDems {
    pub fn new(left_rads: f64, right_rads: f64) -> Self {
        Self {
            left_rads,
            right_rads,
        }
    }

    /// Demands with both wheels stopped.
    pub fn stop() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Actuator which only records what it is sent.
    #[derive(Default)]
    struct Recorder {
        sent: Vec<(f64, f64)>,
    }

    impl MotorActuator for Recorder {
        fn set_wheel_velocities(&mut self, left_rads: f64, right_rads: f64) -> Result<(), CommsError> {
            self.sent.push((left_rads, right_rads));
            Ok(())
        }
    }

    #[test]
    fn test_default_methods_forward_to_wheels() {
        let mut motors = Recorder::default();

        motors.send_demands(&WheelDems::new(1.5, -0.5)).unwrap();
        motors.stop().unwrap();

        assert_eq!(motors.sent, vec![(1.5, -0.5), (0.0, 0.0)]);
        assert_eq!(WheelDems::stop(), WheelDems::new(0.0, 0.0));
    }
}
