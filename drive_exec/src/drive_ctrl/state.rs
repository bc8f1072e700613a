//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{raw_speed_rpm, DriveCtrlError, Params, VelocityController};
use crate::{
    filter::LowpassFilter,
    hal::{counts_delta, EncoderCounts},
    kinematics::{BodyVelocity, KinematicModel, WheelSpeeds},
    motion::MotionProfiler,
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive control module state
#[derive(Default)]
pub struct DriveCtrl {
    pub(crate) params: Params,

    kinematics: KinematicModel,
    velocity_ctrl: VelocityController,

    filter_left: LowpassFilter,
    filter_right: LowpassFilter,

    profile_left: MotionProfiler,
    profile_right: MotionProfiler,

    /// Counts read on the previous cycle, `None` until initialised.
    previous_counts: Option<EncoderCounts>,

    pub(crate) report: StatusReport,
    pub(crate) output: Option<OutputData>,
}

/// Initialisation data for DriveCtrl.
pub struct InitData {
    pub params: Params,

    /// Encoder counts at the time the control loop starts, so that the first
    /// cycle measures only the motion since then.
    pub counts: EncoderCounts,
}

/// Input data to DriveCtrl.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputData {
    /// Encoder counts read at the start of this cycle.
    pub counts: EncoderCounts,

    /// Commanded body velocity.
    pub demand: BodyVelocity,
}

/// Output of one DriveCtrl cycle.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct OutputData {
    /// Duty cycle to be written to the left motor.
    pub duty_cycle_left: f64,

    /// Duty cycle to be written to the right motor.
    pub duty_cycle_right: f64,

    /// Wheel speeds required for the commanded body velocity.
    pub desired: WheelSpeeds,

    /// Wheel speed setpoints after the motion profile.
    pub setpoint: WheelSpeeds,

    /// Filtered wheel speeds measured by the encoders.
    pub actual: WheelSpeeds,

    /// Body velocity calculated from the measured wheel speeds.
    pub body_velocity: BodyVelocity,

    /// Distance travelled this cycle.
    ///
    /// Units: meters
    pub delta_translation_m: f64,

    /// Rotation this cycle.
    ///
    /// Units: radians
    pub delta_orientation_rad: f64,
}

/// Status report for DriveCtrl processing.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StatusReport {
    pub duty_cycle_limited_left: bool,
    pub duty_cycle_limited_right: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for DriveCtrl {
    type InitData = InitData;
    type InitError = DriveCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = DriveCtrlError;

    /// Initialise the DriveCtrl module.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.params.validate()?;
        let p = init_data.params;

        self.kinematics = KinematicModel::new(p.wheel_radius_m, p.wheel_separation_m);
        self.velocity_ctrl = VelocityController::from_params(&p);

        for filter in [&mut self.filter_left, &mut self.filter_right].iter_mut() {
            filter.set_period(p.period_s);
            filter.set_frequency(p.lowpass_filter_frequency_rads);
            filter.reset();
        }

        for profile in [&mut self.profile_left, &mut self.profile_right].iter_mut() {
            profile.set(0.0, 0.0);
            profile.set_limits(
                p.max_wheel_speed_rpm,
                p.max_wheel_accel_rpms,
                p.max_wheel_decel_rpms,
            );
        }

        self.previous_counts = Some(init_data.counts);
        self.report = StatusReport::default();
        self.output = None;
        self.params = p;

        Ok(())
    }

    /// Perform one control cycle.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let previous = self
            .previous_counts
            .ok_or(DriveCtrlError::NotInitialised)?;

        // Clear the status report
        self.report = StatusReport::default();

        let period_s = self.params.period_s;

        // Measure the wheel speeds
        let delta_left = counts_delta(previous.left, input_data.counts.left);
        let delta_right = counts_delta(previous.right, input_data.counts.right);
        self.previous_counts = Some(input_data.counts);

        let actual = WheelSpeeds {
            left_rpm: self.filter_left.filter(raw_speed_rpm(
                delta_left,
                self.params.counts_per_turn,
                period_s,
            )),
            right_rpm: self.filter_right.filter(raw_speed_rpm(
                delta_right,
                self.params.counts_per_turn,
                period_s,
            )),
        };

        // Ramp the setpoints towards the commanded speeds
        let desired = self.kinematics.to_wheel_speeds(&input_data.demand);
        let setpoint = WheelSpeeds {
            left_rpm: self.profile_left.step(desired.left_rpm, period_s),
            right_rpm: self.profile_right.step(desired.right_rpm, period_s),
        };

        // Motor commands
        let duty_left = self
            .velocity_ctrl
            .duty_cycle(setpoint.left_rpm, actual.left_rpm);
        let duty_right = self
            .velocity_ctrl
            .duty_cycle(setpoint.right_rpm, actual.right_rpm);

        self.report.duty_cycle_limited_left = duty_left.limited;
        self.report.duty_cycle_limited_right = duty_right.limited;

        // Odometry increments
        let body_velocity = self.kinematics.to_body_velocity(&actual);

        let output = OutputData {
            duty_cycle_left: duty_left.value,
            duty_cycle_right: duty_right.value,
            desired,
            setpoint,
            actual,
            body_velocity,
            delta_translation_m: body_velocity.translational_ms * period_s,
            delta_orientation_rad: body_velocity.rotational_rads * period_s,
        };

        trace!(
            "DriveCtrl output:\n    setpoint: {:?}\n    actual: {:?}\n    duty: ({:.3}, {:.3})",
            output.setpoint,
            output.actual,
            output.duty_cycle_left,
            output.duty_cycle_right
        );

        self.output = Some(output);

        Ok((output, self.report))
    }
}

impl DriveCtrl {
    /// The parameters the module was initialised with.
    pub fn params(&self) -> &Params {
        &self.params
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn init(counts: EncoderCounts) -> DriveCtrl {
        let mut ctrl = DriveCtrl::default();
        ctrl.init(InitData {
            params: Params::default(),
            counts,
        })
        .unwrap();
        ctrl
    }

    #[test]
    fn test_not_initialised() {
        let mut ctrl = DriveCtrl::default();
        assert!(matches!(
            ctrl.proc(&InputData::default()),
            Err(DriveCtrlError::NotInitialised)
        ));
    }

    #[test]
    fn test_invalid_params() {
        let mut params = Params::default();
        params.period_s = -1.0;

        let mut ctrl = DriveCtrl::default();
        assert!(ctrl
            .init(InitData {
                params,
                counts: EncoderCounts::default()
            })
            .is_err());
    }

    #[test]
    fn test_idle() {
        // Non-zero counts at start must not be seen as motion
        let counts = EncoderCounts {
            left: 1234,
            right: -4321,
        };
        let mut ctrl = init(counts);

        let (out, report) = ctrl
            .proc(&InputData {
                counts,
                demand: BodyVelocity::default(),
            })
            .unwrap();

        assert_eq!(out.actual, WheelSpeeds::default());
        assert_eq!(out.duty_cycle_left, 0.5);
        assert_eq!(out.duty_cycle_right, 0.5);
        assert_eq!(out.delta_translation_m, 0.0);
        assert!(!report.duty_cycle_limited_left);
    }

    #[test]
    fn test_measured_speed() {
        // 12 counts per cycle on both wheels, with the right wheel turning
        // backwards, is 600 rpm forwards once the filter has settled.
        let mut ctrl = init(EncoderCounts::default());
        let mut counts = EncoderCounts::default();
        let mut out = OutputData::default();

        for _ in 0..200 {
            counts.left = counts.left.wrapping_add(12);
            counts.right = counts.right.wrapping_sub(12);
            out = ctrl
                .proc(&InputData {
                    counts,
                    demand: BodyVelocity::default(),
                })
                .unwrap()
                .0;
        }

        assert!((out.actual.left_rpm - 600.0).abs() < 0.1);
        assert!((out.actual.right_rpm + 600.0).abs() < 0.1);
        assert!(out.body_velocity.rotational_rads.abs() < 1e-6);

        // 600 rpm on a 37.5 mm wheel
        let expected_ms = 600.0 / 60.0 * 2.0 * std::f64::consts::PI * 0.0375;
        assert!((out.body_velocity.translational_ms - expected_ms).abs() < 1e-3);
        assert!((out.delta_translation_m - expected_ms * 0.001).abs() < 1e-6);
    }

    #[test]
    fn test_setpoint_ramp() {
        let mut ctrl = init(EncoderCounts::default());
        let demand = BodyVelocity {
            translational_ms: 0.3,
            rotational_rads: 0.0,
        };

        let (out, _) = ctrl
            .proc(&InputData {
                counts: EncoderCounts::default(),
                demand,
            })
            .unwrap();

        // 1000 rpm/s for 1 ms
        assert!((out.setpoint.left_rpm - 1.0).abs() < 1e-9);
        assert!((out.setpoint.right_rpm + 1.0).abs() < 1e-9);
        assert!((out.desired.left_rpm - 76.394).abs() < 1e-3);

        let mut out = out;
        for _ in 0..200 {
            out = ctrl
                .proc(&InputData {
                    counts: EncoderCounts::default(),
                    demand,
                })
                .unwrap()
                .0;
            assert!(out.duty_cycle_left >= 0.02 && out.duty_cycle_left <= 0.98);
            assert!(out.duty_cycle_right >= 0.02 && out.duty_cycle_right <= 0.98);
        }

        // Setpoint reached, left motor driven forwards, right backwards
        assert_eq!(out.setpoint, out.desired);
        assert!(out.duty_cycle_left > 0.5);
        assert!(out.duty_cycle_right < 0.5);
    }
}
