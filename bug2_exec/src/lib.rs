//! # Bug2 navigation library.
//!
//! This library allows the executable, the integration tests and the benches to access the
//! navigation modules.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Control loop driver - reads the equipment, runs navigation and sends the wheel demands
pub mod driver;

/// Navigation control module - the Bug2 obstacle avoidance state machine
pub mod nav_ctrl;

/// Executable parameters
pub mod params;

/// Simulation - a kinematic differential drive robot with a sonar ring
pub mod sim;
