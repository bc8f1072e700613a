//! # Periodic scheduler
//!
//! Runs a closure on its own thread at a fixed period. Each subsystem (motor
//! control, behaviour) gets one scheduler.
//!
//! The wake-up times are kept on a fixed grid so that jitter does not
//! accumulate. If a tick finishes after the next wake-up time the tick is
//! counted as an overrun and the grid restarts from the end of that tick, so a
//! late tick is never followed by a burst of catch-up ticks.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A thread executing a closure once per period.
///
/// The thread is stopped and joined when the scheduler is dropped.
pub struct PeriodicScheduler {
    name: String,
    period: Duration,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

/// State shared with the scheduler thread.
#[derive(Default)]
struct Shared {
    stop: AtomicBool,
    num_ticks: AtomicU64,
    num_overruns: AtomicU64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Cannot spawn the {0} scheduler thread: {1}")]
    SpawnFailed(String, std::io::Error),

    #[error("The {0} scheduler thread panicked")]
    Panicked(String),

    #[error("Scheduler period must be greater than zero")]
    ZeroPeriod,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PeriodicScheduler {
    /// Start calling `tick` every `period` on a new thread named `name`.
    ///
    /// The first tick happens immediately.
    pub fn start<F>(name: &str, period: Duration, mut tick: F) -> Result<Self, SchedulerError>
    where
        F: FnMut() + Send + 'static,
    {
        if period == Duration::from_secs(0) {
            return Err(SchedulerError::ZeroPeriod);
        }

        let shared = Arc::new(Shared::default());

        let thread_shared = shared.clone();
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let shared = thread_shared;
                let mut next_wake = Instant::now();
                let mut num_consec_overruns: u64 = 0;

                while !shared.stop.load(Ordering::Acquire) {
                    tick();
                    shared.num_ticks.fetch_add(1, Ordering::Relaxed);

                    next_wake += period;
                    let now = Instant::now();

                    match next_wake.checked_duration_since(now) {
                        Some(d) => {
                            if num_consec_overruns > 1 {
                                debug!(
                                    "{} recovered after {} consecutive overruns",
                                    thread_name, num_consec_overruns
                                );
                            }
                            num_consec_overruns = 0;
                            thread::sleep(d);
                        }
                        None => {
                            shared.num_overruns.fetch_add(1, Ordering::Relaxed);
                            num_consec_overruns += 1;

                            // Only the first of a run is a warning, a slow
                            // host would otherwise flood the log
                            if num_consec_overruns == 1 {
                                warn!(
                                    "{} cycle overran by {:.06} s",
                                    thread_name,
                                    (now - next_wake).as_secs_f64()
                                );
                            }

                            next_wake = now;
                        }
                    }
                }
            })
            .map_err(|e| SchedulerError::SpawnFailed(name.to_string(), e))?;

        info!(
            "{} scheduler started with a period of {:.03} ms",
            name,
            period.as_secs_f64() * 1e3
        );

        Ok(Self {
            name: name.to_string(),
            period,
            shared,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks executed so far.
    pub fn num_ticks(&self) -> u64 {
        self.shared.num_ticks.load(Ordering::Relaxed)
    }

    /// Number of ticks which finished after the start of the next period.
    pub fn num_overruns(&self) -> u64 {
        self.shared.num_overruns.load(Ordering::Relaxed)
    }

    /// Stop the scheduler and wait for the current tick to finish.
    pub fn stop(mut self) -> Result<(), SchedulerError> {
        self.join()
    }

    fn join(&mut self) -> Result<(), SchedulerError> {
        self.shared.stop.store(true, Ordering::Release);

        match self.handle.take() {
            Some(h) => {
                h.join()
                    .map_err(|_| SchedulerError::Panicked(self.name.clone()))?;
                info!(
                    "{} scheduler stopped after {} ticks ({} overruns)",
                    self.name,
                    self.num_ticks(),
                    self.num_overruns()
                );
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for PeriodicScheduler {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();

        let sched = PeriodicScheduler::start("test", Duration::from_millis(1), move || {
            c.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        let ticks = sched.num_ticks();
        sched.stop().unwrap();

        assert!(ticks >= 10, "only {} ticks in 100 ms", ticks);

        // No ticks after stopping
        let after_stop = count.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::Relaxed), after_stop);
        assert!(after_stop as u64 >= ticks);
    }

    #[test]
    fn test_overruns() {
        let sched = PeriodicScheduler::start("slow", Duration::from_millis(1), || {
            thread::sleep(Duration::from_millis(3));
        })
        .unwrap();

        thread::sleep(Duration::from_millis(50));

        assert!(sched.num_overruns() > 0);
        assert!(sched.num_overruns() <= sched.num_ticks());
    }

    #[test]
    fn test_zero_period() {
        assert!(matches!(
            PeriodicScheduler::start("zero", Duration::from_secs(0), || ()),
            Err(SchedulerError::ZeroPeriod)
        ));
    }
}
