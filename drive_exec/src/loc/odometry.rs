//! Odometry integration

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::Pose;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Advance a pose by the distance and rotation travelled in one period.
///
/// The heading is advanced first, and the position is then moved along the
/// new heading.
pub fn integrate(pose: &Pose, delta_translation_m: f64, delta_orientation_rad: f64) -> Pose {
    let alpha_rad = wrap_pi(pose.alpha_rad + delta_orientation_rad);

    Pose {
        x_m: pose.x_m + alpha_rad.cos() * delta_translation_m,
        y_m: pose.y_m + alpha_rad.sin() * delta_translation_m,
        alpha_rad,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_straight() {
        let mut pose = Pose::default();
        for _ in 0..1000 {
            pose = integrate(&pose, 0.0003, 0.0);
        }

        assert!((pose.x_m - 0.3).abs() < 1e-9);
        assert_eq!(pose.y_m, 0.0);
        assert_eq!(pose.alpha_rad, 0.0);
    }

    #[test]
    fn test_new_heading_used() {
        let pose = integrate(&Pose::default(), 1.0, FRAC_PI_2);

        // Moved along the rotated heading, not the initial one
        assert!(pose.x_m.abs() < 1e-12);
        assert!((pose.y_m - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation() {
        // 1 rad/s for 10 s at 1 ms without translation
        let w = 1.0;
        let period = 0.001;
        let mut pose = Pose::default();
        for _ in 0..10_000 {
            pose = integrate(&pose, 0.0, w * period);
            assert!(pose.alpha_rad > -PI && pose.alpha_rad <= PI);
        }

        let expected = wrap_pi(10.0 * w);
        assert!((pose.alpha_rad - expected).abs() < 1e-6);
        assert_eq!(pose.x_m, 0.0);
    }

    #[test]
    fn test_large_step() {
        let pose = integrate(&Pose::default(), 0.0, 1.0e4);
        assert!(pose.alpha_rad > -PI && pose.alpha_rad <= PI);
    }
}
