//! # Kinematic model
//!
//! Mapping between the robot body velocity (translational, rotational) and the
//! angular speed of the two drive wheels of a differential drive robot.
//!
//! Both motors are mounted facing outwards, so for the robot to drive
//! forwards the right wheel turns with the opposite polarity to the left
//! wheel. A positive translational velocity therefore gives a positive left
//! wheel speed and a negative right wheel speed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use std::f64::consts::PI;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Conversion factor from radians/second to revolutions/minute.
const RADS_TO_RPM: f64 = 60.0 / (2.0 * PI);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Geometry of the drive train.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct KinematicModel {
    /// Radius of the drive wheels.
    ///
    /// Units: meters
    pub wheel_radius_m: f64,

    /// Distance between the contact points of the two drive wheels.
    ///
    /// Units: meters
    pub wheel_separation_m: f64,
}

/// Angular speed of the left and right wheels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct WheelSpeeds {
    /// Units: revolutions/minute
    pub left_rpm: f64,

    /// Units: revolutions/minute
    pub right_rpm: f64,
}

/// Velocity of the robot body in the robot frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BodyVelocity {
    /// Units: meters/second
    pub translational_ms: f64,

    /// Units: radians/second, positive counter-clockwise
    pub rotational_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KinematicModel {
    pub fn new(wheel_radius_m: f64, wheel_separation_m: f64) -> Self {
        Self {
            wheel_radius_m,
            wheel_separation_m,
        }
    }

    /// Calculate the wheel speeds which give the robot the required body
    /// velocity.
    pub fn to_wheel_speeds(&self, vel: &BodyVelocity) -> WheelSpeeds {
        let half_sep_m = 0.5 * self.wheel_separation_m;

        WheelSpeeds {
            left_rpm: (vel.translational_ms - half_sep_m * vel.rotational_rads)
                / self.wheel_radius_m
                * RADS_TO_RPM,
            right_rpm: -(vel.translational_ms + half_sep_m * vel.rotational_rads)
                / self.wheel_radius_m
                * RADS_TO_RPM,
        }
    }

    /// Calculate the body velocity resulting from the given wheel speeds.
    pub fn to_body_velocity(&self, speeds: &WheelSpeeds) -> BodyVelocity {
        BodyVelocity {
            translational_ms: (speeds.left_rpm - speeds.right_rpm) / 2.0 / RADS_TO_RPM
                * self.wheel_radius_m,
            rotational_rads: (-speeds.right_rpm - speeds.left_rpm) / self.wheel_separation_m
                / RADS_TO_RPM
                * self.wheel_radius_m,
        }
    }
}
