//! Task sequencer

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use std::collections::VecDeque;

use super::{Task, TaskStatus};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Runs a list of tasks in order.
#[derive(Default)]
pub struct TaskSequencer {
    tasks: VecDeque<Box<dyn Task + Send>>,
    num_done: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TaskSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task to the end of the list.
    pub fn push(&mut self, task: Box<dyn Task + Send>) {
        self.tasks.push_back(task);
    }

    /// Remove all remaining tasks.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Number of tasks still to be run, including the current one.
    pub fn num_pending(&self) -> usize {
        self.tasks.len()
    }

    /// Number of tasks completed so far.
    pub fn num_done(&self) -> usize {
        self.num_done
    }

    /// Run the current task for one cycle.
    ///
    /// Returns `Done` once all tasks are complete.
    pub fn run(&mut self, period_s: f64) -> TaskStatus {
        let status = match self.tasks.front_mut() {
            Some(task) => task.run(period_s),
            None => return TaskStatus::Done,
        };

        if status == TaskStatus::Done {
            self.tasks.pop_front();
            self.num_done += 1;
            info!(
                "Task {} done, {} remaining",
                self.num_done,
                self.tasks.len()
            );
        }

        if self.tasks.is_empty() {
            TaskStatus::Done
        } else {
            TaskStatus::Running
        }
    }
}
