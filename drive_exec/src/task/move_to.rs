//! Move to pose task
//!
//! A polar coordinate position controller. With `rho` the distance to the
//! target, `gamma` the bearing of the target relative to the robot heading
//! and `delta` the heading the robot would have at the target minus the
//! target heading, the commands are
//!
//! ```text
//! v = K1 rho cos(gamma)
//! w = K2 gamma + K1 sin(gamma) cos(gamma) (gamma + K3 delta) / gamma
//! ```
//!
//! which converge to the target pose for positive gains.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

use super::{Task, TaskStatus};
use crate::controller::Controller;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default maximum translational velocity.
///
/// Units: meters/second
pub const DEFAULT_VELOCITY_MS: f64 = 0.3;

/// Default radius around the target within which the task is done.
///
/// Units: meters
pub const DEFAULT_ZONE_M: f64 = 0.02;

const K1: f64 = 2.0;
const K2: f64 = 2.0;
const K3: f64 = 1.0;

/// Below this bearing `sin(gamma) cos(gamma) / gamma` is taken as one.
const SMALL_GAMMA_RAD: f64 = 1.0e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive to a target pose.
pub struct TaskMoveTo {
    controller: Controller,
    x_m: f64,
    y_m: f64,
    alpha_rad: f64,
    velocity_ms: f64,
    zone_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TaskMoveTo {
    pub fn new(controller: Controller, x_m: f64, y_m: f64, alpha_rad: f64) -> Self {
        Self {
            controller,
            x_m,
            y_m,
            alpha_rad,
            velocity_ms: DEFAULT_VELOCITY_MS,
            zone_m: DEFAULT_ZONE_M,
        }
    }

    /// Set the maximum translational velocity.
    pub fn with_velocity(mut self, velocity_ms: f64) -> Self {
        self.velocity_ms = velocity_ms.abs();
        self
    }

    /// Set the radius around the target within which the task is done.
    pub fn with_zone(mut self, zone_m: f64) -> Self {
        self.zone_m = zone_m;
        self
    }
}

impl Task for TaskMoveTo {
    fn run(&mut self, _period_s: f64) -> TaskStatus {
        let x = self.controller.get_x();
        let y = self.controller.get_y();
        let alpha = self.controller.get_alpha();

        let dx = self.x_m - x;
        let dy = self.y_m - y;
        let rho = (dx * dx + dy * dy).sqrt();

        if rho < self.zone_m {
            self.controller.stop();
            debug!(
                "Reached ({:.3}, {:.3}) at ({:.3}, {:.3})",
                self.x_m, self.y_m, x, y
            );
            return TaskStatus::Done;
        }

        let gamma = wrap_pi(dy.atan2(dx) - alpha);
        let delta = wrap_pi(gamma + alpha - self.alpha_rad);

        let sin_cos_over_gamma = if gamma.abs() < SMALL_GAMMA_RAD {
            1.0
        } else {
            gamma.sin() * gamma.cos() / gamma
        };

        let mut v = K1 * rho * gamma.cos();
        let mut w = K2 * gamma + K1 * sin_cos_over_gamma * (gamma + K3 * delta);

        // Limit the speed keeping the curvature of the path
        if v.abs() > self.velocity_ms {
            let scale = self.velocity_ms / v.abs();
            v *= scale;
            w *= scale;
        }

        self.controller.set_translational_velocity(v);
        self.controller.set_rotational_velocity(w);

        TaskStatus::Running
    }
}
