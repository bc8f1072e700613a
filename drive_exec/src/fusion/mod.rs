//! Sensor fusion module
//!
//! Estimates the tilt of the robot around the wheel axle from the IMU. The
//! accelerometer gives an absolute but noisy angle from the direction of
//! gravity, the gyro a smooth but drifting rate. Two estimators combine them
//! every cycle:
//!
//! - a Kalman filter over (angle, rate) measuring both,
//! - a complementary filter adding the lowpass filtered accelerometer angle
//!   to the highpass filtered integral of the gyro.
//!
//! The raw accelerometer angle and the integrated gyro angle are reported
//! alongside for comparison.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod complementary;
mod kalman;
mod params;
mod runner;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::scheduler::SchedulerError;

pub use complementary::*;
pub use kalman::*;
pub use params::*;
pub use runner::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    #[error("Sensor fusion has not been initialised")]
    NotInitialised,

    #[error("Invalid sensor fusion parameter: {0}")]
    InvalidParams(String),

    #[error("Cannot start the sensor fusion loop: {0}")]
    SchedulerError(#[from] SchedulerError),
}
