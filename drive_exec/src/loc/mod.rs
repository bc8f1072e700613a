//! # Localisation module
//!
//! Dead-reckoning of the robot pose from the measured wheel speeds, with an
//! extended Kalman filter tracking the pose uncertainty and correcting the
//! pose from range and bearing observations of beacons at known positions.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod beacon;
mod ekf;
mod odometry;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

pub use beacon::*;
pub use ekf::*;
pub use odometry::*;
pub use params::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading in the global frame) of the robot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Units: meters
    pub x_m: f64,

    /// Units: meters
    pub y_m: f64,

    /// Heading, the angle of the robot's forward axis to the global X axis.
    ///
    /// Units: radians, in the range (-pi, pi]
    pub alpha_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_m: f64, y_m: f64, alpha_rad: f64) -> Self {
        Self {
            x_m,
            y_m,
            alpha_rad: util::maths::wrap_pi(alpha_rad),
        }
    }

    /// Position of the robot as a point.
    pub fn position(&self) -> crate::point::Point {
        crate::point::Point::new(self.x_m, self.y_m)
    }
}
