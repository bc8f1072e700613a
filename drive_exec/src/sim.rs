//! # Simulated drive train
//!
//! A simple plant model standing in for the motors, encoders, IMU and scan
//! sensor so that the control pipeline can run without hardware.
//!
//! Each motor is modelled as a first order system: the wheel speed approaches
//! `Kn * V` with the mechanical time constant of the motor, where `V` is the
//! voltage set by the duty cycle. The plant advances by one control period
//! each time a duty cycle is written, and the true pose of the robot is
//! advanced once both wheels have been updated.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    hal::{DriveHardware, DutyCycleOutput, Imu, ImuSample, QuadratureCounter},
    kinematics::{KinematicModel, WheelSpeeds},
    loc::{integrate, Pose},
    point::Point,
};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Units: meters/second^2
const GRAVITY_MS2: f64 = 9.81;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated drive train.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimParams {
    /// Time by which the plant advances on each control cycle.
    ///
    /// Units: seconds
    pub period_s: f64,

    /// Units: rpm/volt
    pub speed_constant_rpm_per_v: f64,

    /// Units: volts
    pub max_voltage_v: f64,

    /// Mechanical time constant of the motors.
    ///
    /// Units: seconds
    pub time_constant_s: f64,

    pub counts_per_turn: f64,

    /// True wheel radius, which may differ from the one the controller
    /// assumes.
    ///
    /// Units: meters
    pub wheel_radius_m: f64,

    /// Units: meters
    pub wheel_separation_m: f64,

    /// Beacons further away than this are not seen by the scan sensor.
    ///
    /// Units: meters
    pub scan_range_m: f64,

    /// Pose of the robot at the start of the simulation.
    pub initial_pose: Pose,

    /// Tilt of the robot around the wheel axle seen by the IMU.
    ///
    /// Units: radians
    #[serde(default)]
    pub imu_tilt_rad: f64,

    /// Constant error of the gyro rate.
    ///
    /// Units: radians/second
    #[serde(default)]
    pub gyro_bias_rads: f64,
}

/// Handle to the simulated drive train.
#[derive(Clone)]
pub struct SimDrive {
    plant: Arc<Mutex<Plant>>,
}

/// Left or right drive wheel.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Side {
    Left = 0,
    Right = 1,
}

struct Plant {
    params: SimParams,
    kinematics: KinematicModel,

    duty_cycle: [f64; 2],
    speed_rpm: [f64; 2],

    /// Wheel angle in turns, kept in f64 so the count does not drift.
    angle_turns: [f64; 2],

    /// Count offset set by `QuadratureCounter::reset`.
    count_offset: [i64; 2],

    updated: [bool; 2],
    pose: Pose,
}

struct SimCounter {
    plant: Arc<Mutex<Plant>>,
    side: Side,
}

struct SimPwm {
    plant: Arc<Mutex<Plant>>,
    side: Side,
}

struct SimImu {
    plant: Arc<Mutex<Plant>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            period_s: 0.001,
            speed_constant_rpm_per_v: 40.0,
            max_voltage_v: 12.0,
            time_constant_s: 0.03,
            counts_per_turn: 1200.0,
            wheel_radius_m: 0.0375,
            wheel_separation_m: 0.190,
            scan_range_m: 4.0,
            initial_pose: Pose::default(),
            imu_tilt_rad: 0.0,
            gyro_bias_rads: 0.0,
        }
    }
}

impl SimDrive {
    pub fn new(params: SimParams) -> Self {
        let kinematics = KinematicModel::new(params.wheel_radius_m, params.wheel_separation_m);
        let pose = params.initial_pose;

        Self {
            plant: Arc::new(Mutex::new(Plant {
                params,
                kinematics,
                duty_cycle: [0.5; 2],
                speed_rpm: [0.0; 2],
                angle_turns: [0.0; 2],
                count_offset: [0; 2],
                updated: [false; 2],
                pose,
            })),
        }
    }

    /// Encoders and motor outputs connected to this simulation.
    pub fn hardware(&self) -> DriveHardware {
        DriveHardware {
            counter_left: Box::new(SimCounter {
                plant: self.plant.clone(),
                side: Side::Left,
            }),
            counter_right: Box::new(SimCounter {
                plant: self.plant.clone(),
                side: Side::Right,
            }),
            pwm_left: Box::new(SimPwm {
                plant: self.plant.clone(),
                side: Side::Left,
            }),
            pwm_right: Box::new(SimPwm {
                plant: self.plant.clone(),
                side: Side::Right,
            }),
        }
    }

    /// IMU fixed to the simulated robot.
    pub fn imu(&self) -> Box<dyn Imu + Send> {
        Box::new(SimImu {
            plant: self.plant.clone(),
        })
    }

    /// True pose of the simulated robot.
    pub fn true_pose(&self) -> Pose {
        self.plant().pose
    }

    /// True wheel speeds.
    pub fn wheel_speeds(&self) -> WheelSpeeds {
        let plant = self.plant();
        WheelSpeeds {
            left_rpm: plant.speed_rpm[Side::Left as usize],
            right_rpm: plant.speed_rpm[Side::Right as usize],
        }
    }

    /// Last duty cycles written to the (left, right) motors.
    pub fn duty_cycles(&self) -> (f64, f64) {
        let plant = self.plant();
        (
            plant.duty_cycle[Side::Left as usize],
            plant.duty_cycle[Side::Right as usize],
        )
    }

    /// Scan for beacons.
    ///
    /// Each beacon in range is measured (range and bearing) from the true
    /// pose, and the measurement is projected into the global frame from the
    /// `estimated` pose, as the scan processing on the robot would do.
    pub fn observe_beacons(&self, beacons: &[Point], estimated: &Pose) -> Vec<Point> {
        let plant = self.plant();
        let truth = plant.pose;

        beacons
            .iter()
            .filter_map(|b| {
                let dx = b.x - truth.x_m;
                let dy = b.y - truth.y_m;
                let range_m = (dx * dx + dy * dy).sqrt();

                if range_m > plant.params.scan_range_m {
                    return None;
                }

                let bearing_rad = wrap_pi(dy.atan2(dx) - truth.alpha_rad);
                let seen = Point::from_polar(range_m, estimated.alpha_rad + bearing_rad);

                Some(Point::new(estimated.x_m + seen.x, estimated.y_m + seen.y))
            })
            .collect()
    }

    fn plant(&self) -> MutexGuard<'_, Plant> {
        self.plant.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Plant {
    /// Advance one motor by one period with a new duty cycle.
    fn step_motor(&mut self, side: Side, duty_cycle: f64) {
        let i = side as usize;
        let dt = self.params.period_s;

        let duty_cycle = duty_cycle.max(0.0).min(1.0);
        self.duty_cycle[i] = duty_cycle;

        let voltage_v = (2.0 * duty_cycle - 1.0) * self.params.max_voltage_v;
        let target_rpm = self.params.speed_constant_rpm_per_v * voltage_v;

        // Exact discretisation of the first order lag
        let decay = (-dt / self.params.time_constant_s).exp();
        let speed_old = self.speed_rpm[i];
        self.speed_rpm[i] = target_rpm + (speed_old - target_rpm) * decay;

        self.angle_turns[i] += 0.5 * (speed_old + self.speed_rpm[i]) / 60.0 * dt;
        self.updated[i] = true;

        if self.updated[0] && self.updated[1] {
            self.updated = [false; 2];

            let body = self.kinematics.to_body_velocity(&WheelSpeeds {
                left_rpm: self.speed_rpm[0],
                right_rpm: self.speed_rpm[1],
            });
            self.pose = integrate(
                &self.pose,
                body.translational_ms * dt,
                body.rotational_rads * dt,
            );
        }
    }

    /// Counter value of one wheel, wrapped to 16 bits like the hardware
    /// counter.
    fn count(&self, side: Side) -> i16 {
        let i = side as usize;
        let counts = (self.angle_turns[i] * self.params.counts_per_turn) as i64;
        (counts + self.count_offset[i]) as i16
    }
}

impl QuadratureCounter for SimCounter {
    fn read(&mut self) -> i16 {
        let plant = self.plant.lock().unwrap_or_else(PoisonError::into_inner);
        plant.count(self.side)
    }

    fn reset(&mut self, offset: i16) {
        let mut plant = self.plant.lock().unwrap_or_else(PoisonError::into_inner);
        let i = self.side as usize;
        let counts = (plant.angle_turns[i] * plant.params.counts_per_turn) as i64;
        plant.count_offset[i] = offset as i64 - counts;
    }
}

impl DutyCycleOutput for SimPwm {
    fn set_duty_cycle(&mut self, duty_cycle: f64) {
        let mut plant = self.plant.lock().unwrap_or_else(PoisonError::into_inner);
        plant.step_motor(self.side, duty_cycle);
    }
}

impl Imu for SimImu {
    fn read(&mut self) -> ImuSample {
        let plant = self.plant.lock().unwrap_or_else(PoisonError::into_inner);
        let tilt = plant.params.imu_tilt_rad;

        ImuSample {
            acceleration_y_ms2: -GRAVITY_MS2 * tilt.sin(),
            acceleration_z_ms2: GRAVITY_MS2 * tilt.cos(),
            gyro_x_rads: plant.params.gyro_bias_rads,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_motor_response() {
        let sim = SimDrive::new(SimParams::default());
        let mut hw = sim.hardware();

        // 0.75 duty is 6 V, 240 rpm at steady state
        for _ in 0..500 {
            hw.set_duty_cycles(0.75, 0.25);
        }

        let speeds = sim.wheel_speeds();
        assert!((speeds.left_rpm - 240.0).abs() < 1e-3);
        assert!((speeds.right_rpm + 240.0).abs() < 1e-3);

        // Forward motion along the X axis
        let pose = sim.true_pose();
        assert!(pose.x_m > 0.0);
        assert!(pose.y_m.abs() < 1e-9);
        assert!(pose.alpha_rad.abs() < 1e-9);

        let counts = hw.read_counts();
        assert!(counts.left > 0);
        assert_eq!(counts.left, -counts.right);
    }

    #[test]
    fn test_counter_wraps() {
        let sim = SimDrive::new(SimParams::default());
        let mut hw = sim.hardware();

        hw.counter_left.reset(i16::MAX - 5);

        for _ in 0..50 {
            hw.set_duty_cycles(0.9, 0.5);
        }

        // Wrapped past the top of the range into negative counts
        assert!(hw.counter_left.read() < 0);
    }

    #[test]
    fn test_observe_beacons() {
        let sim = SimDrive::new(SimParams::default());
        let beacons = [Point::new(2.0, 1.0), Point::new(10.0, 0.0)];

        // Estimate equal to the truth: measured equals known
        let seen = sim.observe_beacons(&beacons, &Pose::default());
        assert_eq!(seen.len(), 1);
        assert!((seen[0].x - 2.0).abs() < 1e-9);
        assert!((seen[0].y - 1.0).abs() < 1e-9);

        // Estimate offset: the measurement moves with the estimate
        let seen = sim.observe_beacons(&beacons, &Pose::new(0.1, 0.0, 0.0));
        assert!((seen[0].x - 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_imu() {
        let sim = SimDrive::new(SimParams {
            imu_tilt_rad: 0.05,
            gyro_bias_rads: 0.002,
            ..SimParams::default()
        });
        let sample = sim.imu().read();

        let tilt = (-sample.acceleration_y_ms2).atan2(sample.acceleration_z_ms2);
        assert!((tilt - 0.05).abs() < 1e-12);
        assert_eq!(sample.gyro_x_rads, 0.002);
    }
}
