//! # Communications interface crate.
//!
//! Provides the interfaces between the navigation software and the equipment
//! it drives. Any simulator or real robot driver can be used by implementing
//! the traits in [`eqpt`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Interfaces and data structures for equipment (pose, range sensors, motors)
pub mod eqpt;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An error communicating with a piece of equipment.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommsError {
    #[error("The equipment is not connected")]
    NotConnected,

    #[error("The equipment did not respond within {0} ms")]
    Timeout(u64),

    #[error("The equipment returned invalid data: {0}")]
    InvalidData(String),

    #[error("Equipment driver error: {0}")]
    Driver(String),
}
