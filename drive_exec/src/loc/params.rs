//! Parameters structure for localisation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the pose estimator.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Params {
    /// Standard deviation of the travelled distance per meter travelled.
    ///
    /// Units: meters/meter
    pub sigma_translation: f64,

    /// Standard deviation of the heading change added on every control
    /// cycle.
    ///
    /// Units: radians
    pub sigma_orientation_rad: f64,

    /// Standard deviation of a beacon range measurement.
    ///
    /// Units: meters
    pub sigma_distance_m: f64,

    /// Standard deviation of a beacon bearing measurement.
    ///
    /// Units: radians
    pub sigma_gamma_rad: f64,

    /// Beacons closer to the estimated position than this are ignored, as
    /// the bearing to them is undefined.
    ///
    /// Units: meters
    pub min_beacon_range_m: f64,

    /// Pose at startup.
    pub initial_pose: Pose,

    /// Variances of x, y and alpha at startup.
    ///
    /// Units: m^2, m^2, rad^2
    pub initial_variance: [f64; 3],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            sigma_translation: 0.01,
            sigma_orientation_rad: 0.0001,
            sigma_distance_m: 0.01,
            sigma_gamma_rad: 0.03,
            min_beacon_range_m: 0.001,
            initial_pose: Pose::default(),
            initial_variance: [0.0; 3],
        }
    }
}
