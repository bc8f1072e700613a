//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::DriveCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Params {
    // ---- TIMING ----
    /// Period of the control cycle.
    ///
    /// Units: seconds
    pub period_s: f64,

    // ---- SENSING ----
    /// Encoder counts per revolution of the wheel (pololu motors: 1200,
    /// maxon motors: 86016).
    pub counts_per_turn: f64,

    /// Cutoff frequency of the wheel speed lowpass filters.
    ///
    /// Units: radians/second
    pub lowpass_filter_frequency_rads: f64,

    // ---- MOTOR ----
    /// Speed constant of the motors (pololu motors: 40, maxon motors: 45).
    ///
    /// Units: rpm/volt
    pub speed_constant_rpm_per_v: f64,

    /// Proportional gain of the speed controller.
    ///
    /// Units: volts/rpm
    pub k_p: f64,

    /// Supply voltage of the motor drivers.
    ///
    /// Units: volts
    pub max_voltage_v: f64,

    /// Lowest duty cycle ever written to the motor outputs.
    pub min_duty_cycle: f64,

    /// Highest duty cycle ever written to the motor outputs.
    pub max_duty_cycle: f64,

    // ---- GEOMETRY ----
    /// Units: meters
    pub wheel_radius_m: f64,

    /// Units: meters
    pub wheel_separation_m: f64,

    // ---- CAPABILITIES ----
    /// Maximum wheel speed setpoint.
    ///
    /// Units: rpm
    pub max_wheel_speed_rpm: f64,

    /// Maximum rate of increase of the wheel speed setpoint magnitude.
    ///
    /// Units: rpm/second
    pub max_wheel_accel_rpms: f64,

    /// Maximum rate of decrease of the wheel speed setpoint magnitude.
    ///
    /// Units: rpm/second
    pub max_wheel_decel_rpms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            period_s: 0.001,
            counts_per_turn: 1200.0,
            lowpass_filter_frequency_rads: 300.0,
            speed_constant_rpm_per_v: 40.0,
            k_p: 0.01,
            max_voltage_v: 12.0,
            min_duty_cycle: 0.02,
            max_duty_cycle: 0.98,
            wheel_radius_m: 0.0375,
            wheel_separation_m: 0.190,
            max_wheel_speed_rpm: 400.0,
            max_wheel_accel_rpms: 1000.0,
            max_wheel_decel_rpms: 2000.0,
        }
    }
}

impl Params {
    /// Check that the parameters describe a usable controller.
    pub fn validate(&self) -> Result<(), DriveCtrlError> {
        let positive = [
            ("period_s", self.period_s),
            ("counts_per_turn", self.counts_per_turn),
            ("lowpass_filter_frequency_rads", self.lowpass_filter_frequency_rads),
            ("speed_constant_rpm_per_v", self.speed_constant_rpm_per_v),
            ("max_voltage_v", self.max_voltage_v),
            ("wheel_radius_m", self.wheel_radius_m),
            ("wheel_separation_m", self.wheel_separation_m),
        ];

        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(DriveCtrlError::InvalidParams(format!(
                    "{} must be positive, found {}",
                    name, value
                )));
            }
        }

        if !(0.0 <= self.min_duty_cycle
            && self.min_duty_cycle < self.max_duty_cycle
            && self.max_duty_cycle <= 1.0)
        {
            return Err(DriveCtrlError::InvalidParams(format!(
                "duty cycle limits must satisfy 0 <= min < max <= 1, found [{}, {}]",
                self.min_duty_cycle, self.max_duty_cycle
            )));
        }

        // The speed is calculated from the difference of two 16 bit counter
        // readings, which is only valid below half the counter range.
        let max_counts_per_period =
            self.max_wheel_speed_rpm / 60.0 * self.counts_per_turn * self.period_s;
        if max_counts_per_period > i16::MAX as f64 {
            return Err(DriveCtrlError::InvalidParams(format!(
                "max_wheel_speed_rpm gives {:.0} counts per period, limit is {}",
                max_counts_per_period,
                i16::MAX
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_valid() {
        Params::default().validate().unwrap();
    }

    #[test]
    fn test_invalid() {
        let mut p = Params::default();
        p.period_s = 0.0;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.min_duty_cycle = 0.9;
        p.max_duty_cycle = 0.1;
        assert!(p.validate().is_err());

        // 86016 counts/turn at 30000 rpm is 43008 counts/ms
        let mut p = Params::default();
        p.counts_per_turn = 86016.0;
        p.max_wheel_speed_rpm = 30000.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let p: Params = util::params::from_str(
            r#"
            period_s = 0.001
            counts_per_turn = 1200.0
            lowpass_filter_frequency_rads = 300.0
            speed_constant_rpm_per_v = 40.0
            k_p = 0.01
            max_voltage_v = 12.0
            min_duty_cycle = 0.02
            max_duty_cycle = 0.98
            wheel_radius_m = 0.0375
            wheel_separation_m = 0.190
            max_wheel_speed_rpm = 400.0
            max_wheel_accel_rpms = 1000.0
            max_wheel_decel_rpms = 2000.0
            "#,
        )
        .unwrap();

        assert_eq!(p.counts_per_turn, 1200.0);
        p.validate().unwrap();
    }
}
