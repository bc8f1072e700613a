//! Implementations for the tilt estimator state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{ComplementaryFilter, FusionError, Params, TiltKalman};
use crate::hal::ImuSample;
use util::{maths::wrap_pi, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Tilt estimator module state
#[derive(Default)]
pub struct TiltEstimator {
    params: Params,

    /// `None` until initialised.
    filters: Option<Filters>,

    angles: TiltAngles,
}

struct Filters {
    kalman: TiltKalman,
    complementary: ComplementaryFilter,
}

/// Tilt around the wheel axle from each estimator.
///
/// Units: radians
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TiltAngles {
    /// Direction of gravity seen by the accelerometer.
    pub accelerometer_rad: f64,

    /// Integral of the gyro rate since initialisation.
    pub gyro_rad: f64,

    pub kalman_rad: f64,

    pub complementary_rad: f64,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StatusReport {
    /// The accelerometer gave a usable direction of gravity.
    pub gravity_valid: bool,

    /// The sample was not used as the gyro rate is not finite.
    pub sample_rejected: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for TiltEstimator {
    type InitData = Params;
    type InitError = FusionError;

    type InputData = ImuSample;
    type OutputData = TiltAngles;
    type StatusReport = StatusReport;
    type ProcError = FusionError;

    fn init(&mut self, params: Self::InitData) -> Result<(), Self::InitError> {
        params.validate()?;

        self.filters = Some(Filters {
            kalman: TiltKalman::new(&params),
            complementary: ComplementaryFilter::new(
                params.period_s,
                params.lowpass_frequency_rads,
                params.highpass_frequency_rads,
            ),
        });
        self.angles = TiltAngles::default();
        self.params = params;

        Ok(())
    }

    fn proc(
        &mut self,
        sample: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let filters = self.filters.as_mut().ok_or(FusionError::NotInitialised)?;
        let mut report = StatusReport::default();

        let rate = sample.gyro_x_rads;
        if !rate.is_finite() {
            report.sample_rejected = true;
            return Ok((self.angles, report));
        }

        let accel_angle = accelerometer_angle(sample, self.params.min_gravity_ms2);
        report.gravity_valid = accel_angle.is_some();

        if let Some(angle) = accel_angle {
            self.angles.accelerometer_rad = angle;
        }
        self.angles.gyro_rad = wrap_pi(self.angles.gyro_rad + rate * self.params.period_s);

        filters.kalman.predict();
        match accel_angle {
            Some(angle) => filters.kalman.correct(angle, rate),
            None => filters.kalman.correct_rate(rate),
        };
        self.angles.kalman_rad = filters.kalman.angle();

        self.angles.complementary_rad = filters.complementary.update(accel_angle, rate);

        trace!("Tilt: {:?}", self.angles);

        Ok((self.angles, report))
    }
}

impl TiltEstimator {
    /// Latest estimates.
    pub fn angles(&self) -> TiltAngles {
        self.angles
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// Tilt around the x axis from the direction of gravity in the y-z plane.
///
/// `None` if the measured acceleration is too small to give a direction.
pub fn accelerometer_angle(sample: &ImuSample, min_gravity_ms2: f64) -> Option<f64> {
    let y = -sample.acceleration_y_ms2;
    let z = sample.acceleration_z_ms2;

    let magnitude = (y * y + z * z).sqrt();
    if !(magnitude.is_finite() && magnitude >= min_gravity_ms2) {
        return None;
    }

    Some(y.atan2(z))
}

#[cfg(test)]
mod test {
    use super::*;

    const G: f64 = 9.81;

    /// Reading of a stationary IMU tilted by `angle` with a gyro bias.
    fn sample(angle: f64, gyro_x_rads: f64) -> ImuSample {
        ImuSample {
            acceleration_y_ms2: -G * angle.sin(),
            acceleration_z_ms2: G * angle.cos(),
            gyro_x_rads,
        }
    }

    fn estimator() -> TiltEstimator {
        let mut est = TiltEstimator::default();
        est.init(Params::default()).unwrap();
        est
    }

    #[test]
    fn test_not_initialised() {
        let mut est = TiltEstimator::default();
        assert!(matches!(
            est.proc(&sample(0.0, 0.0)),
            Err(FusionError::NotInitialised)
        ));

        let mut params = Params::default();
        params.min_gravity_ms2 = -1.0;
        assert!(est.init(params).is_err());
    }

    #[test]
    fn test_accelerometer_angle() {
        let a = accelerometer_angle(&sample(0.25, 0.0), 2.0).unwrap();
        assert!((a - 0.25).abs() < 1e-12);

        let a = accelerometer_angle(&sample(-1.0, 0.0), 2.0).unwrap();
        assert!((a + 1.0).abs() < 1e-12);

        // Free fall gives no direction
        let free_fall = ImuSample {
            acceleration_y_ms2: 0.1,
            acceleration_z_ms2: 0.2,
            gyro_x_rads: 0.0,
        };
        assert_eq!(accelerometer_angle(&free_fall, 2.0), None);
    }

    #[test]
    fn test_constant_tilt() {
        let mut est = estimator();

        // 10 s at 2 ms
        let mut angles = TiltAngles::default();
        for _ in 0..5000 {
            let (a, report) = est.proc(&sample(0.3, 0.0)).unwrap();
            assert!(report.gravity_valid);
            angles = a;
        }

        assert!((angles.accelerometer_rad - 0.3).abs() < 1e-12);
        assert!((angles.kalman_rad - 0.3).abs() < 1e-6);
        assert!((angles.complementary_rad - 0.3).abs() < 1e-3);
        assert_eq!(angles.gyro_rad, 0.0);
    }

    #[test]
    fn test_gyro_drift_rejected() {
        let mut est = estimator();

        // 60 s with a gyro bias of 0.01 rad/s
        for _ in 0..30_000 {
            est.proc(&sample(0.2, 0.01)).unwrap();
        }
        let angles = est.angles();

        // Pure integration drifts by 0.6 rad, the fused angles stay close
        assert!((angles.gyro_rad - 0.6).abs() < 1e-6);
        assert!((angles.kalman_rad - 0.2).abs() < 0.005);
        assert!((angles.complementary_rad - 0.2).abs() < 0.015);
    }

    #[test]
    fn test_invalid_samples() {
        let mut est = estimator();
        for _ in 0..1000 {
            est.proc(&sample(0.1, 0.0)).unwrap();
        }
        let before = est.angles();

        let (angles, report) = est
            .proc(&ImuSample {
                acceleration_y_ms2: 0.0,
                acceleration_z_ms2: 0.0,
                gyro_x_rads: 0.0,
            })
            .unwrap();
        assert!(!report.gravity_valid);
        assert_eq!(angles.accelerometer_rad, before.accelerometer_rad);
        assert!((angles.kalman_rad - before.kalman_rad).abs() < 1e-6);

        let (angles, report) = est.proc(&sample(0.1, std::f64::NAN)).unwrap();
        assert!(report.sample_rejected);
        assert!(angles.kalman_rad.is_finite());
        assert!(angles.complementary_rad.is_finite());
    }
}
