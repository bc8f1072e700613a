//! # Controller
//!
//! Ties the drive control module, the hardware and the pose estimator into the
//! per-cycle control pipeline:
//!
//! 1. Read the encoder counters
//! 2. Run [`DriveCtrl`] on the commanded body velocity
//! 3. Write the motor duty cycles
//! 4. Predict the pose from the measured body velocity
//!
//! The pipeline is owned by a [`ControlLoop`], which normally runs on a
//! [`PeriodicScheduler`]. Other threads use a [`Controller`] handle to
//! command velocities, read the pose and correct it with beacon observations.
//!
//! Setpoints and telemetry are exchanged through atomic cells so that readers
//! never block the control cycle. The pose estimate is behind a mutex, which
//! serialises the prediction of the control cycle with corrections coming from
//! other threads.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use nalgebra::Matrix3;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

// Internal
use crate::{
    drive_ctrl::{self, DriveCtrl, DriveCtrlError, InitData, InputData, OutputData},
    hal::DriveHardware,
    kinematics::BodyVelocity,
    loc::{self, Correction, Pose, PoseEkf},
    point::Point,
    scheduler::{PeriodicScheduler, SchedulerError},
};
use util::{atomic::AtomicF64, module::State};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Duty cycle giving zero volts across the motors.
const NEUTRAL_DUTY_CYCLE: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to a running control loop.
///
/// Cheap to clone, every clone refers to the same loop.
#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

/// The control pipeline of the robot.
pub struct ControlLoop {
    drive_ctrl: DriveCtrl,
    hw: DriveHardware,
    shared: Arc<Shared>,
}

/// State shared between the control loop and its handles.
struct Shared {
    // ---- SETPOINTS ----
    translational_velocity_ms: AtomicF64,
    rotational_velocity_rads: AtomicF64,

    // ---- TELEMETRY ----
    x_m: AtomicF64,
    y_m: AtomicF64,
    alpha_rad: AtomicF64,
    actual_translational_velocity_ms: AtomicF64,
    actual_rotational_velocity_rads: AtomicF64,

    // ---- ESTIMATOR ----
    estimator: Mutex<PoseEkf>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Shared {
    fn estimator(&self) -> MutexGuard<'_, PoseEkf> {
        // A panic while the lock was held leaves a complete estimate behind,
        // since every update replaces the pose and covariance as a whole.
        self.estimator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_pose(&self, pose: &Pose) {
        self.x_m.store(pose.x_m);
        self.y_m.store(pose.y_m);
        self.alpha_rad.store(pose.alpha_rad);
    }
}

impl ControlLoop {
    /// Create the control loop.
    ///
    /// The motors are set to zero volts and the current encoder counts are
    /// taken as the reference for the first cycle.
    pub fn new(
        params: drive_ctrl::Params,
        loc_params: loc::Params,
        mut hw: DriveHardware,
    ) -> Result<Self, DriveCtrlError> {
        hw.set_duty_cycles(NEUTRAL_DUTY_CYCLE, NEUTRAL_DUTY_CYCLE);

        let mut drive_ctrl = DriveCtrl::default();
        drive_ctrl.init(InitData {
            params,
            counts: hw.read_counts(),
        })?;

        let estimator = PoseEkf::new(loc_params);
        let pose = estimator.pose();

        let shared = Arc::new(Shared {
            translational_velocity_ms: AtomicF64::new(0.0),
            rotational_velocity_rads: AtomicF64::new(0.0),
            x_m: AtomicF64::new(pose.x_m),
            y_m: AtomicF64::new(pose.y_m),
            alpha_rad: AtomicF64::new(pose.alpha_rad),
            actual_translational_velocity_ms: AtomicF64::new(0.0),
            actual_rotational_velocity_rads: AtomicF64::new(0.0),
            estimator: Mutex::new(estimator),
        });

        Ok(Self {
            drive_ctrl,
            hw,
            shared,
        })
    }

    /// Get a handle to this loop.
    pub fn controller(&self) -> Controller {
        Controller {
            shared: self.shared.clone(),
        }
    }

    /// Period at which [`ControlLoop::tick`] must be called.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.drive_ctrl.params().period_s)
    }

    /// Execute one control cycle.
    pub fn tick(&mut self) -> Result<OutputData, DriveCtrlError> {
        let input = InputData {
            counts: self.hw.read_counts(),
            demand: BodyVelocity {
                translational_ms: self.shared.translational_velocity_ms.load(),
                rotational_rads: self.shared.rotational_velocity_rads.load(),
            },
        };

        let (output, report) = self.drive_ctrl.proc(&input)?;

        self.hw
            .set_duty_cycles(output.duty_cycle_left, output.duty_cycle_right);

        if report.duty_cycle_limited_left || report.duty_cycle_limited_right {
            trace!("Duty cycle limited: {:?}", report);
        }

        self.shared
            .actual_translational_velocity_ms
            .store(output.body_velocity.translational_ms);
        self.shared
            .actual_rotational_velocity_rads
            .store(output.body_velocity.rotational_rads);

        let pose = {
            let mut estimator = self.shared.estimator();
            estimator.predict(output.delta_translation_m, output.delta_orientation_rad);
            estimator.pose()
        };
        self.shared.publish_pose(&pose);

        Ok(output)
    }

    /// Run the loop on its own scheduler thread.
    ///
    /// The loop is dropped, and the motors set to zero volts, when the
    /// returned scheduler is stopped.
    pub fn spawn(mut self, name: &str) -> Result<PeriodicScheduler, SchedulerError> {
        let period = self.period();

        PeriodicScheduler::start(name, period, move || {
            if let Err(e) = self.tick() {
                warn!("DriveCtrl processing error: {}", e);
            }
        })
    }
}

impl Drop for ControlLoop {
    fn drop(&mut self) {
        self.hw
            .set_duty_cycles(NEUTRAL_DUTY_CYCLE, NEUTRAL_DUTY_CYCLE);
    }
}

impl Controller {
    /// Set the commanded translational velocity.
    ///
    /// Units: meters/second
    pub fn set_translational_velocity(&self, velocity_ms: f64) {
        self.shared.translational_velocity_ms.store(velocity_ms);
    }

    /// Set the commanded rotational velocity.
    ///
    /// Units: radians/second
    pub fn set_rotational_velocity(&self, velocity_rads: f64) {
        self.shared.rotational_velocity_rads.store(velocity_rads);
    }

    /// Set both velocity setpoints to zero.
    pub fn stop(&self) {
        self.set_translational_velocity(0.0);
        self.set_rotational_velocity(0.0);
    }

    pub fn get_translational_velocity(&self) -> f64 {
        self.shared.translational_velocity_ms.load()
    }

    pub fn get_rotational_velocity(&self) -> f64 {
        self.shared.rotational_velocity_rads.load()
    }

    /// Translational velocity measured by the encoders.
    ///
    /// Units: meters/second
    pub fn get_actual_translational_velocity(&self) -> f64 {
        self.shared.actual_translational_velocity_ms.load()
    }

    /// Rotational velocity measured by the encoders.
    ///
    /// Units: radians/second
    pub fn get_actual_rotational_velocity(&self) -> f64 {
        self.shared.actual_rotational_velocity_rads.load()
    }

    pub fn get_x(&self) -> f64 {
        self.shared.x_m.load()
    }

    pub fn get_y(&self) -> f64 {
        self.shared.y_m.load()
    }

    pub fn get_alpha(&self) -> f64 {
        self.shared.alpha_rad.load()
    }

    /// Pose as published at the end of the last cycle.
    ///
    /// The fields are read individually, use [`Controller::estimate`] for a
    /// consistent snapshot.
    pub fn get_pose(&self) -> Pose {
        Pose {
            x_m: self.get_x(),
            y_m: self.get_y(),
            alpha_rad: self.get_alpha(),
        }
    }

    /// Consistent snapshot of the pose and its covariance.
    pub fn estimate(&self) -> (Pose, Matrix3<f64>) {
        let estimator = self.shared.estimator();
        (estimator.pose(), estimator.covariance())
    }

    /// Replace the pose estimate.
    pub fn reset_pose(&self, pose: Pose, covariance: Matrix3<f64>) {
        let mut estimator = self.shared.estimator();
        estimator.reset(pose, covariance);
        self.shared.publish_pose(&estimator.pose());
    }

    /// Correct the pose with an observation of a beacon.
    ///
    /// `known` is the surveyed position of the beacon and `measured` the
    /// position at which it was observed, both in the global frame.
    pub fn correct_pose_with_beacon(&self, known: &Point, measured: &Point) -> Correction {
        let mut estimator = self.shared.estimator();
        let correction = estimator.correct(known, measured);

        if let Correction::Applied { .. } = correction {
            self.shared.publish_pose(&estimator.pose());
        }

        correction
    }
}
