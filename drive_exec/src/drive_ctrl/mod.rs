//! Drive control module
//!
//! Runs the per-cycle speed control of the two drive motors: converts the
//! commanded body velocity into wheel speed setpoints, ramps them with a
//! motion profile, and calculates the motor duty cycles from the setpoints
//! and the filtered wheel speeds measured by the encoders.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;
mod velocity;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;
pub use velocity::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("DriveCtrl has not been initialised")]
    NotInitialised,

    #[error("Invalid DriveCtrl parameter: {0}")]
    InvalidParams(String),
}
