//! Kalman filter over the tilt angle and rate

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix2, RowVector2, Vector2};

use super::Params;
use util::maths::{ang_diff, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Constant rate Kalman filter with state `(angle, rate)`.
///
/// The accelerometer measures the angle and the gyro the rate, so the
/// measurement matrix is the identity.
#[derive(Clone, Debug)]
pub struct TiltKalman {
    period_s: f64,
    state: Vector2<f64>,
    covariance: Matrix2<f64>,
    process_noise: Matrix2<f64>,
    measurement_noise: Matrix2<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TiltKalman {
    /// Create a filter at zero angle and rate with zero covariance.
    pub fn new(params: &Params) -> Self {
        Self {
            period_s: params.period_s,
            state: Vector2::zeros(),
            covariance: Matrix2::zeros(),
            process_noise: Matrix2::new(
                params.sigma_q_angle_rad.powi(2),
                0.0,
                0.0,
                params.sigma_q_rate_rads.powi(2),
            ),
            measurement_noise: Matrix2::new(
                params.sigma_r_angle_rad.powi(2),
                0.0,
                0.0,
                params.sigma_r_rate_rads.powi(2),
            ),
        }
    }

    /// Units: radians
    pub fn angle(&self) -> f64 {
        self.state[0]
    }

    /// Units: radians/second
    pub fn rate(&self) -> f64 {
        self.state[1]
    }

    pub fn covariance(&self) -> Matrix2<f64> {
        self.covariance
    }

    /// Set the state and clear the covariance.
    pub fn reset(&mut self, angle_rad: f64, rate_rads: f64) {
        self.state = Vector2::new(wrap_pi(angle_rad), rate_rads);
        self.covariance = Matrix2::zeros();
    }

    /// Advance the state by one period at the estimated rate.
    pub fn predict(&mut self) {
        let f = Matrix2::new(1.0, self.period_s, 0.0, 1.0);

        self.state = f * self.state;
        self.state[0] = wrap_pi(self.state[0]);
        self.covariance = f * self.covariance * f.transpose() + self.process_noise;
    }

    /// Correct with an accelerometer angle and a gyro rate.
    ///
    /// Returns `false`, leaving the filter unchanged, if the innovation
    /// covariance cannot be inverted.
    pub fn correct(&mut self, angle_rad: f64, rate_rads: f64) -> bool {
        let s = self.covariance + self.measurement_noise;
        let s_inv = match s.try_inverse() {
            Some(i) => i,
            None => return false,
        };

        let k = self.covariance * s_inv;
        let innovation = Vector2::new(
            ang_diff(angle_rad, self.state[0]),
            rate_rads - self.state[1],
        );

        self.state += k * innovation;
        self.state[0] = wrap_pi(self.state[0]);
        self.covariance = (Matrix2::identity() - k) * self.covariance;

        true
    }

    /// Correct with a gyro rate only, used when the accelerometer gives no
    /// angle.
    pub fn correct_rate(&mut self, rate_rads: f64) -> bool {
        let h = RowVector2::new(0.0, 1.0);
        let s = self.covariance[(1, 1)] + self.measurement_noise[(1, 1)];
        if !(s > 0.0) {
            return false;
        }

        let k = self.covariance * h.transpose() / s;

        self.state += k * (rate_rads - self.state[1]);
        self.state[0] = wrap_pi(self.state[0]);
        self.covariance = (Matrix2::identity() - k * h) * self.covariance;

        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_converges_to_measurement() {
        let mut kf = TiltKalman::new(&Params::default());

        // 10 s at 2 ms
        for _ in 0..5000 {
            kf.predict();
            assert!(kf.correct(0.3, 0.0));
        }

        assert!((kf.angle() - 0.3).abs() < 1e-6);
        assert!(kf.rate().abs() < 1e-6);

        let p = kf.covariance();
        assert!(p[(0, 0)] > 0.0 && p[(0, 0)] < 1e-6);
        assert!(p[(1, 1)] > 0.0);
    }

    #[test]
    fn test_predict() {
        let params = Params::default();
        let mut kf = TiltKalman::new(&params);
        kf.reset(0.1, 2.0);

        kf.predict();
        assert!((kf.angle() - (0.1 + 2.0 * params.period_s)).abs() < 1e-12);
        assert_eq!(kf.rate(), 2.0);

        // Zero covariance grows by the process noise only
        let p = kf.covariance();
        assert!((p[(0, 0)] - params.sigma_q_angle_rad.powi(2)).abs() < 1e-18);
        assert!((p[(1, 1)] - params.sigma_q_rate_rads.powi(2)).abs() < 1e-18);
        assert_eq!(p[(0, 1)], 0.0);
    }

    #[test]
    fn test_rate_only() {
        let mut kf = TiltKalman::new(&Params::default());
        kf.reset(0.2, 0.0);

        // Without the accelerometer the angle follows the gyro
        for _ in 0..500 {
            kf.predict();
            assert!(kf.correct_rate(0.5));
        }

        assert!((kf.rate() - 0.5).abs() < 1e-6);
        assert!((kf.angle() - (0.2 + 0.5 * 1.0)).abs() < 0.01);
    }

    #[test]
    fn test_angle_wraps() {
        let mut kf = TiltKalman::new(&Params::default());
        kf.reset(3.1, 0.0);

        // Measurement just across the +-pi boundary pulls the short way
        for _ in 0..5000 {
            kf.predict();
            kf.correct(-3.1, 0.0);
        }

        assert!((ang_diff(kf.angle(), -3.1)).abs() < 1e-6);
    }
}
