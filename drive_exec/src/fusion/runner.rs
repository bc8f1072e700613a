//! Cyclic execution of the tilt estimator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use std::sync::Arc;
use std::time::Duration;

// Internal
use super::{FusionError, Params, TiltAngles, TiltEstimator};
use crate::{hal::Imu, scheduler::PeriodicScheduler};
use util::{atomic::AtomicF64, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to the angles published by a running tilt estimator.
#[derive(Clone, Default)]
pub struct Tilt {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    accelerometer_rad: AtomicF64,
    gyro_rad: AtomicF64,
    kalman_rad: AtomicF64,
    complementary_rad: AtomicF64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tilt {
    pub fn accelerometer(&self) -> f64 {
        self.shared.accelerometer_rad.load()
    }

    pub fn gyro(&self) -> f64 {
        self.shared.gyro_rad.load()
    }

    pub fn kalman(&self) -> f64 {
        self.shared.kalman_rad.load()
    }

    pub fn complementary(&self) -> f64 {
        self.shared.complementary_rad.load()
    }

    /// All angles, each read individually.
    pub fn angles(&self) -> TiltAngles {
        TiltAngles {
            accelerometer_rad: self.accelerometer(),
            gyro_rad: self.gyro(),
            kalman_rad: self.kalman(),
            complementary_rad: self.complementary(),
        }
    }

    fn publish(&self, angles: &TiltAngles) {
        self.shared.accelerometer_rad.store(angles.accelerometer_rad);
        self.shared.gyro_rad.store(angles.gyro_rad);
        self.shared.kalman_rad.store(angles.kalman_rad);
        self.shared.complementary_rad.store(angles.complementary_rad);
    }
}

/// Start the tilt estimator on its own scheduler, reading `imu` once per
/// period.
pub fn spawn_tilt_estimator(
    params: Params,
    mut imu: Box<dyn Imu + Send>,
    name: &str,
) -> Result<(PeriodicScheduler, Tilt), FusionError> {
    let mut estimator = TiltEstimator::default();
    estimator.init(params)?;

    let period = Duration::from_secs_f64(estimator.params().period_s);

    let tilt = Tilt::default();
    let handle = tilt.clone();

    let sched = PeriodicScheduler::start(name, period, move || {
        match estimator.proc(&imu.read()) {
            Ok((angles, _)) => handle.publish(&angles),
            Err(e) => warn!("Sensor fusion processing error: {}", e),
        }
    })?;

    Ok((sched, tilt))
}
