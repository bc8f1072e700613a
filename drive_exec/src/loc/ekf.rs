//! # Pose EKF
//!
//! Extended Kalman filter over the pose `(x, y, alpha)`.
//!
//! The prediction step runs once per control cycle with the odometry
//! increments. The covariance is propagated as
//!
//! ```text
//! P' = F P F^T + G diag(st^2, so^2) G^T
//! ```
//!
//! where `F` is the Jacobian of the odometry update with respect to the pose,
//! `G` its Jacobian with respect to the travelled distance and rotation, and
//! both are evaluated at the heading after the rotation. The product is
//! written out element by element.
//!
//! The correction step takes a beacon at a known position and the position
//! at which it was observed (the measured range and bearing projected into
//! the global frame from the estimated pose) and fuses the range and bearing
//! innovation into the pose.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, trace};
use nalgebra::{Matrix2, Matrix2x3, Matrix3, Matrix3x2, Vector2, Vector3};

use super::{integrate, Params, Pose};
use crate::point::Point;
use util::maths::{ang_diff, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Innovation covariances with a determinant smaller than this are not
/// inverted.
const MIN_INNOVATION_DETERMINANT: f64 = 1.0e-18;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pose estimate and its covariance.
#[derive(Clone, Debug)]
pub struct PoseEkf {
    pose: Pose,
    covariance: Matrix3<f64>,
    params: Params,
}

/// Outcome of a beacon correction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Correction {
    /// The observation was fused into the estimate.
    Applied {
        /// Measured minus estimated range to the beacon.
        ///
        /// Units: meters
        range_innovation_m: f64,

        /// Measured minus estimated bearing to the beacon.
        ///
        /// Units: radians
        bearing_innovation_rad: f64,
    },

    /// The observation was ignored because the measurement model is
    /// singular for it (beacon at the estimated position, non-finite input).
    Degenerate,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseEkf {
    /// Create a new filter at the initial pose and variances of the
    /// parameters.
    pub fn new(params: Params) -> Self {
        let v = params.initial_variance;

        Self {
            pose: Pose::new(
                params.initial_pose.x_m,
                params.initial_pose.y_m,
                params.initial_pose.alpha_rad,
            ),
            covariance: Matrix3::from_diagonal(&Vector3::new(v[0], v[1], v[2])),
            params,
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn covariance(&self) -> Matrix3<f64> {
        self.covariance
    }

    /// Replace the estimate.
    pub fn reset(&mut self, pose: Pose, covariance: Matrix3<f64>) {
        self.pose = Pose::new(pose.x_m, pose.y_m, pose.alpha_rad);
        self.covariance = covariance;
    }

    /// Advance the pose by the odometry increments of one cycle and grow the
    /// covariance accordingly.
    pub fn predict(&mut self, delta_translation_m: f64, delta_orientation_rad: f64) {
        self.pose = integrate(&self.pose, delta_translation_m, delta_orientation_rad);

        self.covariance = predict_covariance(
            &self.covariance,
            delta_translation_m,
            self.pose.alpha_rad,
            self.params.sigma_translation * delta_translation_m.abs(),
            self.params.sigma_orientation_rad,
        );
    }

    /// Correct the estimate with an observation of a beacon.
    ///
    /// `known` is the surveyed position of the beacon, `measured` the
    /// position at which it was observed, both in the global frame.
    pub fn correct(&mut self, known: &Point, measured: &Point) -> Correction {
        let x = self.pose.x_m;
        let y = self.pose.y_m;
        let alpha = self.pose.alpha_rad;

        let dx = known.x - x;
        let dy = known.y - y;
        let r = (dx * dx + dy * dy).sqrt();

        if !r.is_finite() || r < self.params.min_beacon_range_m {
            debug!(
                "Beacon correction skipped, beacon at ({:.3}, {:.3}) is {:.2e} m from the pose",
                known.x, known.y, r
            );
            return Correction::Degenerate;
        }

        // Measurement jacobian of (range, bearing) wrt. (x, y, alpha)
        let r2 = r * r;
        let h = Matrix2x3::new(-dx / r, -dy / r, 0.0, dy / r2, -dx / r2, -1.0);

        let measurement_noise = Matrix2::new(
            self.params.sigma_distance_m.powi(2),
            0.0,
            0.0,
            self.params.sigma_gamma_rad.powi(2),
        );

        let p = self.covariance;
        let s = h * p * h.transpose() + measurement_noise;

        let s_inv = match invert_2x2(&s) {
            Some(i) => i,
            None => {
                debug!("Beacon correction skipped, singular innovation covariance {:?}", s);
                return Correction::Degenerate;
            }
        };

        let k: Matrix3x2<f64> = p * h.transpose() * s_inv;

        // Innovation
        let range_estimated = r;
        let mdx = measured.x - x;
        let mdy = measured.y - y;
        let range_measured = (mdx * mdx + mdy * mdy).sqrt();
        let gamma_estimated = wrap_pi(dy.atan2(dx) - alpha);
        let gamma_measured = wrap_pi(mdy.atan2(mdx) - alpha);

        let innovation = Vector2::new(
            range_measured - range_estimated,
            ang_diff(gamma_measured, gamma_estimated),
        );

        if !innovation.iter().all(|i| i.is_finite()) {
            debug!(
                "Beacon correction skipped, non-finite observation ({}, {})",
                measured.x, measured.y
            );
            return Correction::Degenerate;
        }

        let delta = k * innovation;

        self.pose = Pose::new(x + delta[0], y + delta[1], alpha + delta[2]);
        self.covariance = (Matrix3::identity() - k * h) * p;

        trace!(
            "Beacon correction: innovation ({:.4} m, {:.4} rad), pose now ({:.3}, {:.3}, {:.3})",
            innovation[0],
            innovation[1],
            self.pose.x_m,
            self.pose.y_m,
            self.pose.alpha_rad
        );

        Correction::Applied {
            range_innovation_m: innovation[0],
            bearing_innovation_rad: innovation[1],
        }
    }
}

/// Propagate the pose covariance over one odometry step.
///
/// - `dt`: distance travelled in the step (m)
/// - `alpha`: heading after the step (rad)
/// - `st`: standard deviation of the travelled distance (m)
/// - `so`: standard deviation of the rotation (rad)
pub fn predict_covariance(p: &Matrix3<f64>, dt: f64, alpha: f64, st: f64, so: f64) -> Matrix3<f64> {
    let (s, c) = alpha.sin_cos();
    let st2 = st * st;
    let so2 = so * so;

    // Variance of the heading after the step, which every term coupling the
    // position to the heading picks up.
    let q = so2 + p[(2, 2)];

    let p00 = p[(0, 0)] + st2 * c * c + dt * dt * q * s * s - dt * (p[(0, 2)] + p[(2, 0)]) * s;
    let p01 = p[(0, 1)] - dt * p[(2, 1)] * s + c * (dt * p[(0, 2)] + (st2 - dt * dt * q) * s);
    let p02 = p[(0, 2)] - dt * q * s;

    let p10 = p[(1, 0)] - dt * p[(1, 2)] * s + c * (dt * p[(2, 0)] + (st2 - dt * dt * q) * s);
    let p11 = p[(1, 1)] + dt * dt * q * c * c + dt * (p[(1, 2)] + p[(2, 1)]) * c + st2 * s * s;
    let p12 = p[(1, 2)] + dt * q * c;

    let p20 = p[(2, 0)] - dt * q * s;
    let p21 = p[(2, 1)] + dt * q * c;
    let p22 = p[(2, 2)] + so2;

    Matrix3::new(p00, p01, p02, p10, p11, p12, p20, p21, p22)
}

/// Closed form inverse of a 2x2 matrix, `None` if it is singular.
fn invert_2x2(m: &Matrix2<f64>) -> Option<Matrix2<f64>> {
    let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];

    if !det.is_finite() || det.abs() < MIN_INNOVATION_DETERMINANT {
        return None;
    }

    Some(Matrix2::new(m[(1, 1)], -m[(0, 1)], -m[(1, 0)], m[(0, 0)]) / det)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn ekf_at(pose: Pose, covariance: Matrix3<f64>) -> PoseEkf {
        let mut ekf = PoseEkf::new(Params::default());
        ekf.reset(pose, covariance);
        ekf
    }

    fn test_covariance() -> Matrix3<f64> {
        Matrix3::new(0.04, 0.01, 0.002, 0.01, 0.03, -0.001, 0.002, -0.001, 0.01)
    }

    #[test]
    fn test_predict_zero_motion() {
        let p = test_covariance();
        let mut ekf = ekf_at(Pose::new(1.0, -2.0, 0.7), p);

        ekf.predict(0.0, 0.0);

        let so2 = Params::default().sigma_orientation_rad.powi(2);
        let expected = p + Matrix3::from_diagonal(&Vector3::new(0.0, 0.0, so2));
        assert_eq!(ekf.covariance(), expected);
        assert_eq!(ekf.pose(), Pose::new(1.0, -2.0, 0.7));
    }

    #[test]
    fn test_predict_matches_jacobians() {
        let p = test_covariance();
        let dt = 0.05;
        let alpha: f64 = 2.1;
        let st = 0.003;
        let so = 0.002;

        let (s, c) = alpha.sin_cos();
        let f = Matrix3::new(1.0, 0.0, -dt * s, 0.0, 1.0, dt * c, 0.0, 0.0, 1.0);
        let g = Matrix3x2::new(c, -dt * s, s, dt * c, 0.0, 1.0);
        let q = Matrix2::new(st * st, 0.0, 0.0, so * so);
        let expected = f * p * f.transpose() + g * q * g.transpose();

        let actual = predict_covariance(&p, dt, alpha, st, so);

        for i in 0..3 {
            for j in 0..3 {
                assert!(
                    (actual[(i, j)] - expected[(i, j)]).abs() < 1e-12,
                    "element ({}, {}): {} != {}",
                    i,
                    j,
                    actual[(i, j)],
                    expected[(i, j)]
                );
            }
        }
    }

    #[test]
    fn test_predict_grows_uncertainty() {
        let mut ekf = PoseEkf::new(Params::default());

        for _ in 0..1000 {
            ekf.predict(0.0003, 0.0001);
        }

        let p = ekf.covariance();
        assert!(p[(0, 0)] > 0.0);
        assert!(p[(2, 2)] > 0.0);
        assert!((ekf.pose().x_m - 0.3).abs() < 0.01);
        assert!((ekf.pose().alpha_rad - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_consistent_observation() {
        let pose = Pose::new(1.0, 2.0, 0.3);
        let p = test_covariance();
        let mut ekf = ekf_at(pose, p);

        let beacon = Point::new(3.0, 1.0);
        let correction = ekf.correct(&beacon, &beacon);

        assert_eq!(
            correction,
            Correction::Applied {
                range_innovation_m: 0.0,
                bearing_innovation_rad: 0.0
            }
        );
        assert_eq!(ekf.pose(), pose);

        let p_new = ekf.covariance();
        for i in 0..3 {
            assert!(p_new[(i, i)] <= p[(i, i)] + 1e-15);
            assert!(p_new[(i, i)] >= 0.0);
        }
        assert!(p_new[(0, 0)] < p[(0, 0)]);
    }

    #[test]
    fn test_range_correction() {
        // Estimate 0.1 m ahead of the true pose at the origin, beacon 2 m
        // ahead. The observation projected from the estimate lands 0.1 m
        // beyond the beacon.
        let mut ekf = ekf_at(
            Pose::new(0.1, 0.0, 0.0),
            Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, 0.1)),
        );

        let correction = ekf.correct(&Point::new(2.0, 0.0), &Point::new(2.1, 0.0));

        match correction {
            Correction::Applied {
                range_innovation_m,
                bearing_innovation_rad,
            } => {
                assert!((range_innovation_m - 0.1).abs() < 1e-12);
                assert_eq!(bearing_innovation_rad, 0.0);
            }
            Correction::Degenerate => panic!("correction not applied"),
        }

        let pose = ekf.pose();
        assert!(pose.x_m.abs() < 1e-3);
        assert!(pose.y_m.abs() < 1e-12);
        assert!(ekf.covariance()[(0, 0)] < 1e-3);
    }

    #[test]
    fn test_bearing_wrap() {
        // Beacon behind the robot, the estimated and measured bearings lie
        // either side of +/-pi
        let mut ekf = ekf_at(
            Pose::default(),
            Matrix3::from_diagonal(&Vector3::new(0.01, 0.01, 0.01)),
        );

        let correction = ekf.correct(&Point::new(-2.0, 0.001), &Point::new(-2.0, -0.001));

        match correction {
            Correction::Applied {
                bearing_innovation_rad,
                ..
            } => {
                assert!((bearing_innovation_rad - 0.001).abs() < 1e-6);
            }
            Correction::Degenerate => panic!("correction not applied"),
        }

        assert!(ekf.pose().alpha_rad.abs() < 0.01);
        assert!(ekf.pose().alpha_rad > -PI && ekf.pose().alpha_rad <= PI);
    }

    #[test]
    fn test_degenerate() {
        let pose = Pose::new(0.5, 0.5, 1.0);
        let p = test_covariance();
        let mut ekf = ekf_at(pose, p);

        // Beacon exactly at the estimated position
        let correction = ekf.correct(&Point::new(0.5, 0.5), &Point::new(0.6, 0.4));

        assert_eq!(correction, Correction::Degenerate);
        assert_eq!(ekf.pose(), pose);
        assert_eq!(ekf.covariance(), p);

        // Non-finite observations are also ignored
        let correction = ekf.correct(&Point::new(2.0, 0.5), &Point::new(f64::NAN, 0.4));
        assert_eq!(correction, Correction::Degenerate);
        assert_eq!(ekf.pose(), pose);
        assert!(ekf.covariance().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_invert_2x2() {
        let m = Matrix2::new(2.0, 1.0, 1.0, 3.0);
        let i = invert_2x2(&m).unwrap();
        let id = m * i;

        assert!((id - Matrix2::identity()).norm() < 1e-12);
        assert!(invert_2x2(&Matrix2::new(1.0, 2.0, 2.0, 4.0)).is_none());
    }
}
