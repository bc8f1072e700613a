//! Parameters structure for the sensor fusion

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::FusionError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the tilt estimation.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Params {
    /// Period of the fusion cycle.
    ///
    /// Units: seconds
    pub period_s: f64,

    // ---- KALMAN FILTER ----
    /// Process noise of the angle per cycle.
    ///
    /// Units: radians
    pub sigma_q_angle_rad: f64,

    /// Process noise of the rate per cycle.
    ///
    /// Units: radians/second
    pub sigma_q_rate_rads: f64,

    /// Noise of the accelerometer angle.
    ///
    /// Units: radians
    pub sigma_r_angle_rad: f64,

    /// Noise of the gyro rate.
    ///
    /// Units: radians/second
    pub sigma_r_rate_rads: f64,

    // ---- COMPLEMENTARY FILTER ----
    /// Cutoff of the lowpass on the accelerometer angle.
    ///
    /// Units: radians/second
    pub lowpass_frequency_rads: f64,

    /// Cutoff of the highpass on the integrated gyro rate.
    ///
    /// Units: radians/second
    pub highpass_frequency_rads: f64,

    // ---- ACCELEROMETER ----
    /// Accelerometer readings with a smaller magnitude in the y-z plane give
    /// no usable direction of gravity and are not used for the angle.
    ///
    /// Units: meters/second^2
    pub min_gravity_ms2: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            period_s: 0.002,
            sigma_q_angle_rad: 1.0e-5,
            sigma_q_rate_rads: 0.01,
            sigma_r_angle_rad: 1.0e-3,
            sigma_r_rate_rads: 1.0e-6,
            lowpass_frequency_rads: 1.0,
            highpass_frequency_rads: 1.0,
            min_gravity_ms2: 2.0,
        }
    }
}

impl Params {
    /// Check that all parameters are finite and positive.
    pub fn validate(&self) -> Result<(), FusionError> {
        let positive = [
            ("period_s", self.period_s),
            ("sigma_q_angle_rad", self.sigma_q_angle_rad),
            ("sigma_q_rate_rads", self.sigma_q_rate_rads),
            ("sigma_r_angle_rad", self.sigma_r_angle_rad),
            ("sigma_r_rate_rads", self.sigma_r_rate_rads),
            ("lowpass_frequency_rads", self.lowpass_frequency_rads),
            ("highpass_frequency_rads", self.highpass_frequency_rads),
            ("min_gravity_ms2", self.min_gravity_ms2),
        ];

        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(FusionError::InvalidParams(format!(
                    "{} must be positive, found {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate() {
        Params::default().validate().unwrap();

        let mut params = Params::default();
        params.sigma_r_rate_rads = 0.0;
        assert!(matches!(
            params.validate(),
            Err(FusionError::InvalidParams(_))
        ));

        let mut params = Params::default();
        params.period_s = std::f64::NAN;
        assert!(params.validate().is_err());
    }
}
