//! Main drive executable entry point.
//!
//! # Architecture
//!
//! The executable runs the control pipeline against the simulated drive
//! train:
//!
//!     - Initialise the session, logging and parameters
//!     - Start the control loop on a 1 ms scheduler
//!     - Start the tilt estimator on a 2 ms scheduler
//!     - Start the behaviour loop on its own scheduler:
//!         - Run the task sequencer
//!         - Periodically scan for beacons and correct the pose
//!     - Wait until all tasks are done or the run time is exceeded
//!     - Stop both loops and report
//!
//! # Modules
//!
//! All cyclic modules (e.g. `drive_ctrl`, `fusion`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use drive_lib::{
    controller::ControlLoop,
    drive_ctrl,
    fusion::{self, spawn_tilt_estimator},
    loc::{self, nearest_beacon, Correction},
    params::DriveExecParams,
    scheduler::PeriodicScheduler,
    sim::SimDrive,
    task::{TaskSequencer, TaskStatus},
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Period at which the main thread checks for the end of the run.
const MONITOR_PERIOD_S: f64 = 0.1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Counters of the beacon corrections made by the behaviour loop.
#[derive(Default)]
struct CorrectionStats {
    num_applied: AtomicU64,
    num_degenerate: AtomicU64,
    num_unassociated: AtomicU64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    // Initialise session
    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Differential Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let drive_ctrl_params: drive_ctrl::Params =
        util::params::load("drive_ctrl.toml").wrap_err("Could not load DriveCtrl params")?;
    let loc_params: loc::Params =
        util::params::load("loc.toml").wrap_err("Could not load localisation params")?;
    let fusion_params: fusion::Params =
        util::params::load("fusion.toml").wrap_err("Could not load sensor fusion params")?;
    let exec_params: DriveExecParams =
        util::params::load("drive_exec.toml").wrap_err("Could not load exec params")?;

    info!("Parameters loaded");

    // ---- INITIALISE CONTROL LOOP ----

    let sim = SimDrive::new(exec_params.sim.clone());

    let control_loop = ControlLoop::new(drive_ctrl_params, loc_params, sim.hardware())
        .wrap_err("Failed to initialise the control loop")?;
    let controller = control_loop.controller();

    let drive_sched = control_loop
        .spawn("drive_ctrl")
        .wrap_err("Failed to start the control loop")?;

    // ---- INITIALISE SENSOR FUSION ----

    let (fusion_sched, tilt) = spawn_tilt_estimator(fusion_params, sim.imu(), "fusion")
        .wrap_err("Failed to start the sensor fusion")?;

    // ---- INITIALISE BEHAVIOUR LOOP ----

    let mut sequencer = TaskSequencer::new();
    for desc in exec_params.tasks.iter() {
        sequencer.push(desc.build(&controller));
    }
    info!("{} tasks loaded", sequencer.num_pending());

    let done = Arc::new(AtomicBool::new(false));
    let stats = Arc::new(CorrectionStats::default());

    let behaviour_sched = {
        let controller = controller.clone();
        let sim = sim.clone();
        let done = done.clone();
        let stats = stats.clone();
        let beacons = exec_params.beacons.clone();
        let period_s = exec_params.behaviour_period_s;
        let scan_every = exec_params.scan_every_num_cycles.max(1);
        let threshold_m = exec_params.beacon_association_threshold_m;
        let mut num_cycles: u64 = 0;

        PeriodicScheduler::start(
            "behaviour",
            Duration::from_secs_f64(period_s),
            move || {
                if done.load(Ordering::Relaxed) {
                    return;
                }

                // ---- BEACON CORRECTION ----

                if num_cycles % scan_every == 0 {
                    let estimate = controller.get_pose();

                    for measured in sim.observe_beacons(&beacons, &estimate) {
                        let known = match nearest_beacon(&measured, &beacons, threshold_m) {
                            Some(k) => k,
                            None => {
                                stats.num_unassociated.fetch_add(1, Ordering::Relaxed);
                                continue;
                            }
                        };

                        match controller.correct_pose_with_beacon(known, &measured) {
                            Correction::Applied { .. } => {
                                stats.num_applied.fetch_add(1, Ordering::Relaxed)
                            }
                            Correction::Degenerate => {
                                stats.num_degenerate.fetch_add(1, Ordering::Relaxed)
                            }
                        };
                    }
                }

                // ---- TASKS ----

                if sequencer.run(period_s) == TaskStatus::Done {
                    info!("All tasks complete");
                    done.store(true, Ordering::Relaxed);
                }

                num_cycles += 1;
            },
        )
        .wrap_err("Failed to start the behaviour loop")?
    };

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let start_instant = Instant::now();

    while !done.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_secs_f64(MONITOR_PERIOD_S));

        let elapsed_s = (Instant::now() - start_instant).as_secs_f64();

        debug!(
            "Pose: ({:.3}, {:.3}, {:.3}), velocity: ({:.3}, {:.3})",
            controller.get_x(),
            controller.get_y(),
            controller.get_alpha(),
            controller.get_actual_translational_velocity(),
            controller.get_actual_rotational_velocity()
        );

        if elapsed_s > exec_params.max_run_time_s {
            warn!(
                "Run time of {:.1} s exceeded with tasks remaining",
                exec_params.max_run_time_s
            );
            break;
        }
    }

    // ---- SHUTDOWN ----

    behaviour_sched
        .stop()
        .wrap_err("Failed to stop the behaviour loop")?;
    controller.stop();

    // Let the robot come to rest before stopping the control loop
    thread::sleep(Duration::from_secs_f64(0.5));

    fusion_sched
        .stop()
        .wrap_err("Failed to stop the sensor fusion")?;

    let drive_ticks = drive_sched.num_ticks();
    let drive_overruns = drive_sched.num_overruns();
    drive_sched
        .stop()
        .wrap_err("Failed to stop the control loop")?;

    // ---- REPORT ----

    let (pose, covariance) = controller.estimate();
    let truth = sim.true_pose();

    info!("Control loop: {} ticks, {} overruns", drive_ticks, drive_overruns);
    info!(
        "Beacon corrections: {} applied, {} degenerate, {} unassociated",
        stats.num_applied.load(Ordering::Relaxed),
        stats.num_degenerate.load(Ordering::Relaxed),
        stats.num_unassociated.load(Ordering::Relaxed)
    );
    info!(
        "Estimated pose: ({:.3}, {:.3}, {:.3}), std dev: ({:.4}, {:.4}, {:.4})",
        pose.x_m,
        pose.y_m,
        pose.alpha_rad,
        covariance[(0, 0)].max(0.0).sqrt(),
        covariance[(1, 1)].max(0.0).sqrt(),
        covariance[(2, 2)].max(0.0).sqrt()
    );
    info!(
        "True pose:      ({:.3}, {:.3}, {:.3})",
        truth.x_m, truth.y_m, truth.alpha_rad
    );

    let angles = tilt.angles();
    info!(
        "Tilt: accelerometer {:.4}, gyro {:.4}, kalman {:.4}, complementary {:.4} (true {:.4})",
        angles.accelerometer_rad,
        angles.gyro_rad,
        angles.kalman_rad,
        angles.complementary_rad,
        exec_params.sim.imu_tilt_rad
    );

    info!("End of execution");

    Ok(())
}
