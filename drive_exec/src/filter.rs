//! # Lowpass filter
//!
//! Time-discrete lowpass filter used to smooth the wheel speeds computed from
//! quantized encoder counts.
//!
//! The filter is the exact discretisation of a critically damped second
//! order system with a cutoff frequency `w` (rad/s) sampled with a period
//! `T`:
//!
//! ```text
//! x1[k+1] = a11 x1[k] + a12 x2[k] + b1 u[k]
//! x2[k+1] = a21 x1[k] + a22 x2[k] + b2 u[k]
//! y[k]    = w^2 x1[k+1]
//! ```
//!
//! The DC gain is one, so a constant input is reproduced after the transient.

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A second order lowpass filter.
#[derive(Clone, Debug)]
pub struct LowpassFilter {
    period_s: f64,
    frequency_rads: f64,

    a11: f64,
    a12: f64,
    a21: f64,
    a22: f64,
    b1: f64,
    b2: f64,

    x1: f64,
    x2: f64,
}

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const DEFAULT_PERIOD_S: f64 = 1.0;
const DEFAULT_FREQUENCY_RADS: f64 = 1000.0;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LowpassFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD_S, DEFAULT_FREQUENCY_RADS)
    }
}

impl LowpassFilter {
    /// Create a new filter for the given sampling period (s) and cutoff
    /// frequency (rad/s).
    pub fn new(period_s: f64, frequency_rads: f64) -> Self {
        let mut filter = Self {
            period_s,
            frequency_rads,
            a11: 0.0,
            a12: 0.0,
            a21: 0.0,
            a22: 0.0,
            b1: 0.0,
            b2: 0.0,
            x1: 0.0,
            x2: 0.0,
        };
        filter.calc_coeffs();
        filter
    }

    /// Reset the filtered value to zero.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
    }

    /// Reset the filter to the steady state for the given value.
    ///
    /// In steady state the second state, the derivative of the first, is zero.
    pub fn reset_to(&mut self, value: f64) {
        self.x1 = value / self.frequency_rads / self.frequency_rads;
        self.x2 = 0.0;
    }

    /// Set the sampling period of the filter.
    ///
    /// This is typically the period of the cyclic task using the filter.
    ///
    /// Units: seconds
    pub fn set_period(&mut self, period_s: f64) {
        self.period_s = period_s;
        self.calc_coeffs();
    }

    /// Set the cutoff frequency of the filter.
    ///
    /// Units: radians/second
    pub fn set_frequency(&mut self, frequency_rads: f64) {
        self.frequency_rads = frequency_rads;
        self.calc_coeffs();
    }

    /// The cutoff frequency of the filter in radians/second.
    pub fn frequency(&self) -> f64 {
        self.frequency_rads
    }

    /// Filter a new sample, returning the filtered value.
    pub fn filter(&mut self, value: f64) -> f64 {
        let x1_old = self.x1;
        let x2_old = self.x2;

        self.x1 = self.a11 * x1_old + self.a12 * x2_old + self.b1 * value;
        self.x2 = self.a21 * x1_old + self.a22 * x2_old + self.b2 * value;

        self.frequency_rads * self.frequency_rads * self.x1
    }

    fn calc_coeffs(&mut self) {
        let w = self.frequency_rads;
        let t = self.period_s;
        let e = (-w * t).exp();

        self.a11 = (1.0 + w * t) * e;
        self.a12 = t * e;
        self.a21 = -w * w * t * e;
        self.a22 = (1.0 - w * t) * e;
        self.b1 = (1.0 - (1.0 + w * t) * e) / w / w;
        self.b2 = t * e;
    }
}
