//! # Tasks
//!
//! Behaviours which command the controller for a while and then finish. A
//! [`TaskSequencer`] runs a list of tasks one after the other, calling the
//! current task once per behaviour cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod move_to;
mod sequencer;
mod velocity;
mod wait;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::controller::Controller;

pub use move_to::*;
pub use sequencer::*;
pub use velocity::*;
pub use wait::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A behaviour run periodically until it is done.
pub trait Task {
    /// Run one cycle of the task.
    ///
    /// `period_s` is the time since the previous call.
    fn run(&mut self, period_s: f64) -> TaskStatus;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Status of a task after a call to [`Task::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    Running,
    Done,
}

/// Description of a task, as loaded from a parameter file.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskDesc {
    /// Drive at a constant velocity.
    Move {
        translational_velocity_ms: f64,
        rotational_velocity_rads: f64,
        #[serde(default)]
        duration_s: Option<f64>,
    },

    /// Stand still.
    Wait { duration_s: f64 },

    /// Drive to a pose.
    MoveTo {
        x_m: f64,
        y_m: f64,
        alpha_rad: f64,
        #[serde(default)]
        velocity_ms: Option<f64>,
        #[serde(default)]
        zone_m: Option<f64>,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TaskDesc {
    /// Create the described task, commanding the given controller.
    pub fn build(&self, controller: &Controller) -> Box<dyn Task + Send> {
        match *self {
            TaskDesc::Move {
                translational_velocity_ms,
                rotational_velocity_rads,
                duration_s,
            } => {
                let mut t = TaskMove::new(
                    controller.clone(),
                    translational_velocity_ms,
                    rotational_velocity_rads,
                );
                if let Some(d) = duration_s {
                    t = t.with_duration(d);
                }
                Box::new(t)
            }
            TaskDesc::Wait { duration_s } => Box::new(TaskWait::new(controller.clone(), duration_s)),
            TaskDesc::MoveTo {
                x_m,
                y_m,
                alpha_rad,
                velocity_ms,
                zone_m,
            } => {
                let mut t = TaskMoveTo::new(controller.clone(), x_m, y_m, alpha_rad);
                if let Some(v) = velocity_ms {
                    t = t.with_velocity(v);
                }
                if let Some(z) = zone_m {
                    t = t.with_zone(z);
                }
                Box::new(t)
            }
        }
    }
}
