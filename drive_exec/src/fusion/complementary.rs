//! Complementary filter for the tilt angle

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Sum of a first order lowpass on the accelerometer angle and a first order
/// highpass on the integrated gyro rate.
///
/// With equal cutoff frequencies the two filters add up to one, so a true
/// angle seen by both sensors passes unchanged while accelerometer noise and
/// gyro drift are attenuated. A constant gyro bias `b` leaves a constant error
/// of `b / highpass_frequency`.
#[derive(Clone, Debug)]
pub struct ComplementaryFilter {
    period_s: f64,
    lowpass_frequency_rads: f64,
    highpass_frequency_rads: f64,

    accel_angle_filtered: f64,
    gyro_angle_filtered: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ComplementaryFilter {
    pub fn new(period_s: f64, lowpass_frequency_rads: f64, highpass_frequency_rads: f64) -> Self {
        Self {
            period_s,
            lowpass_frequency_rads,
            highpass_frequency_rads,
            accel_angle_filtered: 0.0,
            gyro_angle_filtered: 0.0,
        }
    }

    /// Set the filter to a steady angle.
    pub fn reset(&mut self, angle_rad: f64) {
        self.accel_angle_filtered = angle_rad;
        self.gyro_angle_filtered = 0.0;
    }

    /// Current estimate of the angle.
    ///
    /// Units: radians
    pub fn angle(&self) -> f64 {
        self.accel_angle_filtered + self.gyro_angle_filtered
    }

    /// Filter one sample and return the new angle.
    ///
    /// Without an accelerometer angle the lowpass holds its value.
    pub fn update(&mut self, accel_angle_rad: Option<f64>, gyro_rate_rads: f64) -> f64 {
        let t = self.period_s;

        if let Some(angle) = accel_angle_rad {
            let wt = self.lowpass_frequency_rads * t;
            let sf = wt / (1.0 + wt);
            self.accel_angle_filtered = sf * angle + (1.0 - sf) * self.accel_angle_filtered;
        }

        // Backward Euler highpass on the gyro integral, fed with its increment
        self.gyro_angle_filtered = (self.gyro_angle_filtered + gyro_rate_rads * t)
            / (1.0 + self.highpass_frequency_rads * t);

        self.angle()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_constant_angle() {
        let mut cf = ComplementaryFilter::new(0.002, 1.0, 1.0);

        // 10 s, ten time constants
        let mut angle = 0.0;
        for _ in 0..5000 {
            angle = cf.update(Some(0.3), 0.0);
        }
        assert!((angle - 0.3).abs() < 1e-3);
    }

    #[test]
    fn test_gyro_bias() {
        let mut cf = ComplementaryFilter::new(0.002, 1.0, 1.0);
        cf.reset(0.2);

        // 60 s with a gyro bias of 0.01 rad/s
        for _ in 0..30_000 {
            cf.update(Some(0.2), 0.01);
        }

        // Error settles at bias / frequency instead of growing
        assert!((cf.angle() - 0.21).abs() < 1e-3);
    }

    #[test]
    fn test_fast_rotation() {
        let mut cf = ComplementaryFilter::new(0.002, 1.0, 1.0);

        // A quick tilt is tracked by the gyro before the accelerometer
        // lowpass has moved
        for _ in 0..50 {
            cf.update(Some(0.0), 2.0);
        }
        assert!(cf.angle() > 0.18 && cf.angle() < 0.2);
    }

    #[test]
    fn test_missing_accelerometer() {
        let mut cf = ComplementaryFilter::new(0.002, 1.0, 1.0);
        cf.reset(0.1);

        for _ in 0..100 {
            cf.update(None, 0.0);
        }
        assert_eq!(cf.angle(), 0.1);
    }
}
