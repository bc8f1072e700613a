//! Wait task

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{Task, TaskStatus};
use crate::controller::Controller;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Stand still for a given time.
pub struct TaskWait {
    controller: Controller,
    duration_s: f64,
    time_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TaskWait {
    pub fn new(controller: Controller, duration_s: f64) -> Self {
        Self {
            controller,
            duration_s,
            time_s: 0.0,
        }
    }
}

impl Task for TaskWait {
    fn run(&mut self, period_s: f64) -> TaskStatus {
        self.controller.stop();
        self.time_s += period_s;

        if self.time_s < self.duration_s {
            TaskStatus::Running
        } else {
            TaskStatus::Done
        }
    }
}
