//! # Motion profiler
//!
//! Keeps a position and velocity and increments them towards a target
//! velocity or position with a trapezoidal profile, bounded by a profile
//! velocity, acceleration and deceleration.
//!
//! The profile is recalculated on every increment, so the target and the
//! limits can be changed at any time.
//!
//! Acceleration applies while the magnitude of the velocity grows,
//! deceleration while it shrinks towards zero (including the first part of a
//! reversal). All calculations are done for motion in the positive direction;
//! negative motion is handled by mirroring the state.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default value of the profile limits.
const DEFAULT_LIMIT: f64 = 1.0;

/// Smallest value accepted for a profile limit.
const MINIMUM_LIMIT: f64 = 1.0e-9;

/// Maximum number of phases in a profile.
const MAX_PHASES: usize = 4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State of a trapezoidal motion profile.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct MotionProfiler {
    /// Integrated position of the profile.
    ///
    /// Units: meters, radians or revolutions depending on the velocity units.
    position: f64,

    /// Current velocity of the profile.
    velocity: f64,

    profile_velocity: f64,
    profile_acceleration: f64,
    profile_deceleration: f64,
}

/// A period of constant acceleration: `(duration_s, acceleration)`.
type Phase = (f64, f64);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for MotionProfiler {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl MotionProfiler {
    /// Create a new profiler with the given initial position and velocity.
    ///
    /// All limits are set to their default value of 1.
    pub fn new(position: f64, velocity: f64) -> Self {
        Self {
            position,
            velocity,
            profile_velocity: DEFAULT_LIMIT,
            profile_acceleration: DEFAULT_LIMIT,
            profile_deceleration: DEFAULT_LIMIT,
        }
    }

    /// Set the position and velocity of the profile.
    pub fn set(&mut self, position: f64, velocity: f64) {
        self.position = position;
        self.velocity = velocity;
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: f64) {
        self.velocity = velocity;
    }

    pub fn set_profile_velocity(&mut self, profile_velocity: f64) {
        self.profile_velocity = profile_velocity.max(MINIMUM_LIMIT);
    }

    pub fn set_profile_acceleration(&mut self, profile_acceleration: f64) {
        self.profile_acceleration = profile_acceleration.max(MINIMUM_LIMIT);
    }

    pub fn set_profile_deceleration(&mut self, profile_deceleration: f64) {
        self.profile_deceleration = profile_deceleration.max(MINIMUM_LIMIT);
    }

    /// Set the velocity, acceleration and deceleration limits.
    ///
    /// Limits smaller than `1e-9` are raised to `1e-9`.
    pub fn set_limits(&mut self, max_velocity: f64, max_acceleration: f64, max_deceleration: f64) {
        self.set_profile_velocity(max_velocity);
        self.set_profile_acceleration(max_acceleration);
        self.set_profile_deceleration(max_deceleration);
    }

    /// Advance the profile by one period towards the target velocity and
    /// return the new velocity.
    pub fn step(&mut self, target_velocity: f64, period_s: f64) -> f64 {
        self.increment_to_velocity(target_velocity, period_s);
        self.velocity
    }

    /// Increment the motion towards a target velocity.
    ///
    /// The target is limited to the profile velocity. The velocity never
    /// passes the target within one increment.
    pub fn increment_to_velocity(&mut self, target_velocity: f64, period_s: f64) {
        let target = clamp(
            &target_velocity,
            &-self.profile_velocity,
            &self.profile_velocity,
        );

        if target > 0.0 {
            self.increment_to_velocity_positive(target, period_s);
        } else {
            self.mirror();
            self.increment_to_velocity_positive(-target, period_s);
            self.mirror();
        }
    }

    /// Increment the motion towards a target position.
    ///
    /// The motion accelerates to the profile velocity, cruises and then
    /// decelerates to stop at the target.
    pub fn increment_to_position(&mut self, target_position: f64, period_s: f64) {
        let (sign, phases) = self.position_phases(target_position);

        if sign < 0.0 {
            self.mirror();
        }
        self.advance(&phases, period_s);
        if sign < 0.0 {
            self.mirror();
        }
    }

    /// Get the time needed to move to the given target position from the
    /// current state.
    ///
    /// Units: seconds
    pub fn time_to_position(&self, target_position: f64) -> f64 {
        let (_, phases) = self.position_phases(target_position);
        phases.iter().map(|(duration_s, _)| duration_s).sum()
    }

    /// Increment towards a non-negative target velocity.
    fn increment_to_velocity_positive(&mut self, target: f64, period_s: f64) {
        let acc = self.profile_acceleration;
        let dec = self.profile_deceleration;
        let v = self.velocity;

        let mut phases = [(0.0, 0.0); MAX_PHASES];

        if v > target {
            // Slow down to the target
            phases[0] = ((v - target) / dec, -dec);
        } else if v > 0.0 {
            // Speed up to the target
            phases[0] = ((target - v) / acc, acc);
        } else {
            // Slow down to zero first, then speed up to the target
            phases[0] = (-v / dec, dec);
            phases[1] = (target / acc, acc);
        }

        if self.advance(&phases, period_s) {
            self.velocity = target;
        }
    }

    /// Calculate the phases of a move to the target position.
    ///
    /// Returns the direction of the move and the phases expressed for a move
    /// in the positive direction (state mirrored if the direction is
    /// negative).
    fn position_phases(&self, target_position: f64) -> (f64, [Phase; MAX_PHASES]) {
        let dec = self.profile_deceleration;

        // Position reached if the velocity is reduced to zero now
        let stop_position =
            self.position + self.velocity * self.velocity.abs() / dec * 0.5;

        let sign = if target_position > stop_position {
            1.0
        } else {
            -1.0
        };

        let phases = self.position_phases_positive(
            sign * self.position,
            sign * self.velocity,
            sign * target_position,
            sign * stop_position,
        );

        (sign, phases)
    }

    /// Phases of a move to a target which lies beyond the stop position.
    fn position_phases_positive(
        &self,
        position: f64,
        velocity: f64,
        target: f64,
        stop_position: f64,
    ) -> [Phase; MAX_PHASES] {
        let pv = self.profile_velocity;
        let acc = self.profile_acceleration;
        let dec = self.profile_deceleration;
        let v = velocity;

        let mut phases = [(0.0, 0.0); MAX_PHASES];

        if v > pv {
            // Slow down to the profile velocity, cruise, then stop
            let t1 = (v - pv) / dec;
            let t2 = (target - stop_position) / pv;
            let t3 = pv / dec;

            phases[0] = (t1, -dec);
            phases[1] = (t2, 0.0);
            phases[2] = (t3, -dec);
        } else if v > 0.0 {
            // Speed up to the profile velocity, cruise, then stop
            let mut t1 = (pv - v) / acc;
            let mut t3 = pv / dec;
            let mut t2 = ((target - position) - (v + pv) * 0.5 * t1) / pv - 0.5 * t3;

            // Not enough distance to reach the profile velocity
            if t2 < 0.0 {
                // Rounding can take the radicand just below zero when the
                // target is at the stop position
                let max_velocity = ((2.0 * (target - position) * acc + v * v) * dec / (acc + dec))
                    .max(0.0)
                    .sqrt();
                t1 = (max_velocity - v) / acc;
                t2 = 0.0;
                t3 = max_velocity / dec;
            }

            phases[0] = (t1, acc);
            phases[1] = (t2, 0.0);
            phases[2] = (t3, -dec);
        } else {
            // Slow down to zero first, speed up to the profile velocity,
            // cruise, then stop
            let t1 = -v / dec;
            let mut t2 = pv / acc;
            let mut t4 = pv / dec;
            let mut t3 = ((target - position) - v * 0.5 * t1) / pv - 0.5 * (t2 + t4);

            if t3 < 0.0 {
                let max_velocity = ((2.0 * (target - position) * dec + v * v) * acc / (acc + dec))
                    .max(0.0)
                    .sqrt();
                t2 = max_velocity / acc;
                t3 = 0.0;
                t4 = max_velocity / dec;
            }

            phases[0] = (t1, dec);
            phases[1] = (t2, acc);
            phases[2] = (t3, 0.0);
            phases[3] = (t4, -dec);
        }

        phases
    }

    /// Run the given phases for one period. Any time left once all phases are
    /// complete is spent at constant velocity.
    ///
    /// Returns `true` if all phases completed within the period.
    fn advance(&mut self, phases: &[Phase], period_s: f64) -> bool {
        let mut remaining_s = period_s;

        for &(duration_s, acceleration) in phases {
            let dt = duration_s.max(0.0).min(remaining_s);

            self.position += (self.velocity + 0.5 * acceleration * dt) * dt;
            self.velocity += acceleration * dt;
            remaining_s -= dt;

            if dt < duration_s {
                return false;
            }
        }

        self.position += self.velocity * remaining_s;

        true
    }

    fn mirror(&mut self) {
        self.position = -self.position;
        self.velocity = -self.velocity;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_step_limits() {
        let mut m = MotionProfiler::default();
        m.set_limits(100.0, 2000.0, 4000.0);

        let dt = 0.001;
        let max_step = 4000.0 * dt + 1e-9;

        // Accelerate, then reverse, then stop
        let mut prev = m.velocity();
        for &target in &[80.0, -60.0, 0.0] {
            for _ in 0..200 {
                let v = m.step(target, dt);
                assert!((v - prev).abs() <= max_step);
                prev = v;
            }
            assert_eq!(m.velocity(), target);
        }
    }

    #[test]
    fn test_step_accel_decel() {
        let mut m = MotionProfiler::default();
        m.set_limits(10.0, 2.0, 4.0);
        let dt = 0.01;

        // Accelerating uses the acceleration limit
        let v = m.step(1.0, dt);
        assert!((v - 0.02).abs() < 1e-12);

        // Reaches 1.0 within ceil(1.0 / 0.02) steps (plus one for rounding)
        let mut steps = 1;
        while m.velocity() != 1.0 {
            m.step(1.0, dt);
            steps += 1;
            assert!(steps <= 51);
        }

        // Slowing down uses the deceleration limit
        let v = m.step(0.0, dt);
        assert!((v - 0.96).abs() < 1e-12);
    }

    #[test]
    fn test_no_overshoot() {
        let mut m = MotionProfiler::new(0.0, 0.95);
        m.set_limits(10.0, 10.0, 10.0);

        // A single step which could go past the target stops at it
        assert_eq!(m.step(1.0, 0.1), 1.0);
        assert_eq!(m.step(0.99, 0.1), 0.99);

        // Reversal through zero: decelerate then accelerate in one step
        let mut m = MotionProfiler::new(0.0, 0.1);
        m.set_limits(10.0, 1.0, 2.0);
        let v = m.step(-1.0, 0.1);

        // 0.05 s to stop at 2/s^2 then 0.05 s at 1/s^2
        assert!((v + 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_velocity_limited() {
        let mut m = MotionProfiler::default();
        m.set_limits(0.5, 100.0, 100.0);

        for _ in 0..100 {
            m.step(3.0, 0.01);
        }
        assert_eq!(m.velocity(), 0.5);

        for _ in 0..100 {
            m.step(-3.0, 0.01);
        }
        assert_eq!(m.velocity(), -0.5);

        // Tiny limits are raised to the minimum
        m.set_limits(0.0, -1.0, 0.0);
        assert_eq!(m.step(1.0, 1.0), -0.5 + 1.0e-9);
    }

    #[test]
    fn test_time_to_position() {
        let m = MotionProfiler::default();

        // Triangular profile: 1 s up, 1 s down
        assert!((m.time_to_position(1.0) - 2.0).abs() < 1e-12);
        assert!((m.time_to_position(-1.0) - 2.0).abs() < 1e-12);

        // Trapezoidal profile: 1 s up, 1 s cruise, 1 s down
        assert!((m.time_to_position(2.0) - 3.0).abs() < 1e-12);

        // Already there
        assert_eq!(m.time_to_position(0.0), 0.0);
    }

    #[test]
    fn test_target_at_stop_position() {
        for &v in &[0.00137, -0.00137, 0.3, -0.7, 1.1e-5, 2.9] {
            for &dec in &[0.346, 1.0, 3.7, 0.0123] {
                let position = 0.2;
                let mut m = MotionProfiler::new(position, v);
                m.set_limits(10.0, 1.3, dec);

                // Exactly where the motion ends if it stops now
                let target = position + v * v.abs() / (2.0 * dec);

                let t = m.time_to_position(target);
                assert!(t.is_finite(), "v {} dec {}: {}", v, dec, t);
                let expected = v.abs() / dec;
                assert!(
                    (t - expected).abs() < 1e-4 * expected.max(1.0),
                    "v {} dec {}: {}",
                    v,
                    dec,
                    t
                );

                let n = (t / 0.001).ceil() as usize + 10;
                for _ in 0..n {
                    m.increment_to_position(target, 0.001);
                    assert!(m.velocity().is_finite());
                }
                assert!((m.position() - target).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_increment_to_position() {
        let dt = 0.001;

        for &target in &[2.0, -1.5, 0.25] {
            let mut m = MotionProfiler::default();
            m.set_limits(1.0, 2.0, 1.0);

            let t = m.time_to_position(target);
            let n = (t / dt).ceil() as usize + 10;

            for _ in 0..n {
                m.increment_to_position(target, dt);
                assert!(m.velocity().abs() <= 1.0 + 1e-9);
            }

            assert!((m.position() - target).abs() < 1e-3);
            assert!(m.velocity().abs() < 1e-3);
        }
    }

    #[test]
    fn test_increment_to_position_moving_away() {
        // Moving away from the target: stop first, then come back
        let mut m = MotionProfiler::new(0.0, -0.5);
        m.set_limits(1.0, 1.0, 1.0);

        m.increment_to_position(1.0, 0.1);
        assert!((m.velocity() + 0.4).abs() < 1e-12);

        for _ in 0..100_000 {
            m.increment_to_position(1.0, 0.001);
        }
        assert!((m.position() - 1.0).abs() < 1e-3);
    }
}
