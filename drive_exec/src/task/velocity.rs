//! Constant velocity task

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{Task, TaskStatus};
use crate::controller::Controller;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Duration of a move for which none is given, one day.
const DEFAULT_DURATION_S: f64 = 24.0 * 60.0 * 60.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive with a constant velocity for a given time, then stop.
pub struct TaskMove {
    controller: Controller,
    translational_velocity_ms: f64,
    rotational_velocity_rads: f64,
    duration_s: f64,
    time_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TaskMove {
    pub fn new(
        controller: Controller,
        translational_velocity_ms: f64,
        rotational_velocity_rads: f64,
    ) -> Self {
        Self {
            controller,
            translational_velocity_ms,
            rotational_velocity_rads,
            duration_s: DEFAULT_DURATION_S,
            time_s: 0.0,
        }
    }

    pub fn with_duration(mut self, duration_s: f64) -> Self {
        self.duration_s = duration_s;
        self
    }
}

impl Task for TaskMove {
    fn run(&mut self, period_s: f64) -> TaskStatus {
        self.time_s += period_s;

        if self.time_s < self.duration_s {
            self.controller
                .set_translational_velocity(self.translational_velocity_ms);
            self.controller
                .set_rotational_velocity(self.rotational_velocity_rads);
            TaskStatus::Running
        } else {
            self.controller.stop();
            TaskStatus::Done
        }
    }
}
