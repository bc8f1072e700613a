//! Motor speed controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::Params;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Proportional speed controller with feedforward for one motor.
///
/// The motor voltage is the feedforward term `desired / Kn` plus the
/// proportional correction `Kp (desired - actual)`. The voltage is converted
/// into a PWM duty cycle for an H-bridge where 0.5 is zero volts.
#[derive(Clone, Debug, Default)]
pub struct VelocityController {
    k_p: f64,
    speed_constant_rpm_per_v: f64,
    max_voltage_v: f64,
    min_duty_cycle: f64,
    max_duty_cycle: f64,
}

/// Duty cycle produced by the controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DutyCycle {
    /// The duty cycle, within the configured limits.
    pub value: f64,

    /// True if the unlimited duty cycle was outside the configured limits.
    pub limited: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VelocityController {
    pub fn from_params(params: &Params) -> Self {
        Self {
            k_p: params.k_p,
            speed_constant_rpm_per_v: params.speed_constant_rpm_per_v,
            max_voltage_v: params.max_voltage_v,
            min_duty_cycle: params.min_duty_cycle,
            max_duty_cycle: params.max_duty_cycle,
        }
    }

    /// Motor voltage demand for the given desired and actual speeds (rpm).
    pub fn voltage(&self, desired_rpm: f64, actual_rpm: f64) -> f64 {
        self.k_p * (desired_rpm - actual_rpm) + desired_rpm / self.speed_constant_rpm_per_v
    }

    /// Duty cycle for the given desired and actual speeds (rpm).
    pub fn duty_cycle(&self, desired_rpm: f64, actual_rpm: f64) -> DutyCycle {
        let voltage = self.voltage(desired_rpm, actual_rpm);
        let raw = 0.5 + 0.5 * voltage / self.max_voltage_v;

        // NaN speeds (e.g. from a broken filter) must never reach the motor
        // outputs, so they command zero volts.
        if !raw.is_finite() {
            return DutyCycle {
                value: 0.5,
                limited: true,
            };
        }

        let value = clamp(&raw, &self.min_duty_cycle, &self.max_duty_cycle);

        DutyCycle {
            value,
            limited: value != raw,
        }
    }
}

/// Unfiltered wheel speed from the number of encoder counts in one period.
///
/// Units: revolutions/minute
pub fn raw_speed_rpm(delta_counts: i16, counts_per_turn: f64, period_s: f64) -> f64 {
    delta_counts as f64 / counts_per_turn / period_s * 60.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_raw_speed() {
        // 12 counts in 1 ms on a 1200 count encoder is 10 turns/s
        assert!((raw_speed_rpm(12, 1200.0, 0.001) - 600.0).abs() < 1e-9);
        assert!((raw_speed_rpm(-12, 1200.0, 0.001) + 600.0).abs() < 1e-9);
        assert_eq!(raw_speed_rpm(0, 1200.0, 0.001), 0.0);
    }

    #[test]
    fn test_feedforward() {
        let ctrl = VelocityController::from_params(&Params::default());

        // At the setpoint only the feedforward term remains
        assert!((ctrl.voltage(120.0, 120.0) - 3.0).abs() < 1e-12);

        let duty = ctrl.duty_cycle(120.0, 120.0);
        assert!((duty.value - 0.625).abs() < 1e-12);
        assert!(!duty.limited);

        let duty = ctrl.duty_cycle(0.0, 0.0);
        assert_eq!(duty.value, 0.5);
    }

    #[test]
    fn test_proportional() {
        let ctrl = VelocityController::from_params(&Params::default());

        // Below the setpoint the voltage is increased
        assert!(ctrl.voltage(100.0, 50.0) > ctrl.voltage(100.0, 100.0));
        assert!((ctrl.voltage(100.0, 50.0) - (0.5 + 2.5)).abs() < 1e-12);
    }

    #[test]
    fn test_duty_cycle_bounds() {
        let ctrl = VelocityController::from_params(&Params::default());

        for &(desired, actual) in &[
            (0.0, 0.0),
            (1.0e6, 0.0),
            (-1.0e6, 0.0),
            (0.0, 1.0e6),
            (480.0, -480.0),
            (-480.0, 480.0),
            (f64::NAN, 0.0),
            (0.0, f64::INFINITY),
        ] {
            let duty = ctrl.duty_cycle(desired, actual);
            assert!(duty.value >= 0.02 && duty.value <= 0.98);
        }

        let duty = ctrl.duty_cycle(1.0e6, 0.0);
        assert_eq!(duty.value, 0.98);
        assert!(duty.limited);

        let duty = ctrl.duty_cycle(-1.0e6, 0.0);
        assert_eq!(duty.value, 0.02);
        assert!(duty.limited);
    }
}
