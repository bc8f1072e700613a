//! # Hardware abstraction
//!
//! Interfaces to the drive train hardware and the inertial sensor used by the
//! cyclic loops. The register level drivers (timers in encoder mode, PWM
//! outputs, the IMU on its serial bus) implement these traits per platform,
//! the simulated drive train in [`crate::sim`] implements them for testing
//! and offline runs.

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A 16 bit quadrature encoder counter.
///
/// The count increments or decrements with the direction of rotation and
/// wraps modulo 2^16.
pub trait QuadratureCounter {
    /// Read the current count.
    fn read(&mut self) -> i16;

    /// Set the count to the given offset.
    fn reset(&mut self, offset: i16);
}

/// A PWM output driving one motor through an H-bridge.
///
/// A duty cycle of 0.5 gives zero volts across the motor, 0 and 1 give full
/// negative and positive supply voltage.
pub trait DutyCycleOutput {
    /// Set the duty cycle in the range `[0, 1]`.
    fn set_duty_cycle(&mut self, duty_cycle: f64);
}

/// An inertial measurement unit mounted with its x axis along the wheel axle.
pub trait Imu {
    /// Read the accelerometer and gyro.
    fn read(&mut self) -> ImuSample;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The encoders and motor outputs of both drive wheels.
pub struct DriveHardware {
    pub counter_left: Box<dyn QuadratureCounter + Send>,
    pub counter_right: Box<dyn QuadratureCounter + Send>,
    pub pwm_left: Box<dyn DutyCycleOutput + Send>,
    pub pwm_right: Box<dyn DutyCycleOutput + Send>,
}

/// Raw counts of both encoders at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EncoderCounts {
    pub left: i16,
    pub right: i16,
}

/// One reading of the IMU axes used for the tilt around the x axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImuSample {
    /// Units: meters/second^2
    pub acceleration_y_ms2: f64,

    /// Units: meters/second^2
    pub acceleration_z_ms2: f64,

    /// Angular rate around the x axis.
    ///
    /// Units: radians/second
    pub gyro_x_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveHardware {
    /// Read both encoder counters.
    pub fn read_counts(&mut self) -> EncoderCounts {
        EncoderCounts {
            left: self.counter_left.read(),
            right: self.counter_right.read(),
        }
    }

    /// Write the duty cycles of both motors.
    pub fn set_duty_cycles(&mut self, left: f64, right: f64) {
        self.pwm_left.set_duty_cycle(left);
        self.pwm_right.set_duty_cycle(right);
    }
}

/// Number of counts between two readings of a 16 bit counter.
///
/// The subtraction wraps, so the result is correct as long as the counter
/// moved by less than half its range (32767 counts) between the readings.
pub fn counts_delta(previous: i16, current: i16) -> i16 {
    current.wrapping_sub(previous)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_counts_delta() {
        assert_eq!(counts_delta(100, 112), 12);
        assert_eq!(counts_delta(112, 100), -12);

        // Wrap around the top and bottom of the counter range
        assert_eq!(counts_delta(32760, -32766), 10);
        assert_eq!(counts_delta(-32766, 32760), -10);

        // Half range is the limit
        assert_eq!(counts_delta(0, 32767), 32767);
        assert_eq!(counts_delta(0, -32768), -32768);
    }
}
