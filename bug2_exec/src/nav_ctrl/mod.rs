//! Navigation control module
//!
//! Implements the Bug2 obstacle avoidance algorithm. The robot drives towards
//! the target until the front sensor sees an obstacle, turns a quarter turn
//! counter-clockwise, then follows the obstacle's boundary with the obstacle
//! on its right until the target lies a quarter turn to its left.
//!
//! `NavCtrl::proc` performs exactly one control cycle. It does no I/O, so the
//! caller is responsible for gathering the input and sending the demands.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod clearance;
mod controllers;
mod heading;
mod params;
mod state;
pub mod tm;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use clearance::*;
pub use controllers::*;
pub use heading::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during NavCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum NavCtrlError {
    #[error("Invalid navigation parameters: {0}")]
    InvalidParams(String),

    #[error("The {0} passed to NavCtrl contains a NaN or infinite value")]
    NonFiniteInput(&'static str),

    #[error("Sensor {sensor} reported a detection at a non-finite distance ({distance_m})")]
    InvalidReading {
        sensor: usize,
        distance_m: f64
    },
}
