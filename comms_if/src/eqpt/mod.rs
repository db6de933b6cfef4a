//! # Equipment Interface
//!
//! This module defines the traits implemented by equipment drivers, and the data structures passed
//! across them. All calls are synchronous and return a [`CommsError`](crate::CommsError) on
//! failure. Implementations are responsible for bounding how long each call may block.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod motor;
pub mod pose;
pub mod range;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use motor::{MotorActuator, WheelDems};
pub use pose::PoseSource;
pub use range::{RangeReading, RangeSensorArray, RangeSweep, NUM_RANGE_SENSORS};
