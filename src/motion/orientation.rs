//! # Orientation Estimate
//!
//! Absolute pitch from integrated gyro rate, pulled toward the
//! accelerometer's gravity-derived pitch to cancel long-run drift.
//!
//! The correction only runs while the accelerometer reads close to 1 g, so
//! swings and shakes do not drag the estimate around, and only when the
//! error is larger than [`DRIFT_ERROR_THRESHOLD`], so vibration near the
//! true value is ignored.

use std::time::Instant;

use super::{clamped_dt, maybe_deg_to_rad};
use crate::protocol::messages::{Sample, Vec3};

/// Shortest integration step (500 Hz).
pub const DT_MIN: f64 = 1.0 / 500.0;
/// Longest integration step (40 Hz). Missed ticks never integrate more.
pub const DT_MAX: f64 = 1.0 / 40.0;

/// Standard gravity, m/s².
pub const GRAVITY: f64 = 9.81;
/// Accelerometer magnitude must be within this band around [`GRAVITY`].
pub const GRAVITY_TOLERANCE: f64 = 1.2;
/// Minimum gyro/accelerometer disagreement before correcting, radians.
pub const DRIFT_ERROR_THRESHOLD: f64 = 0.03;
/// Complementary filter weight of the gyro estimate.
pub const COMPLEMENTARY_ALPHA: f64 = 0.985;
/// Fraction of the error removed per tick.
pub const DRIFT_STEP: f64 = 1.0 - COMPLEMENTARY_ALPHA;

/// Pitch implied by the gravity vector, radians.
///
/// # Examples
///
/// ```
/// use gyro_pad_bridge::motion::orientation::accel_pitch;
/// use gyro_pad_bridge::protocol::messages::Vec3;
///
/// assert_eq!(accel_pitch(Vec3::new(0.0, 0.0, 9.81)), 0.0);
/// ```
#[must_use]
pub fn accel_pitch(accel: Vec3) -> f64 {
    let denom = (accel.y * accel.y + accel.z * accel.z).sqrt().max(1e-6);
    (-accel.x).atan2(denom)
}

/// Drift-corrected absolute pitch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationEstimate {
    last_update: Option<Instant>,
    pitch: f64,
}

impl OrientationEstimate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current absolute pitch, radians.
    #[must_use]
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Integrates one sample.
    ///
    /// The first call only records `now`; integration starts on the second.
    /// Returns `true` when the accelerometer correction was applied.
    pub fn update(&mut self, sample: &Sample, now: Instant) -> bool {
        let Some(last) = self.last_update.replace(now) else {
            return false;
        };

        let dt = clamped_dt(last, now, DT_MIN, DT_MAX);
        self.pitch += maybe_deg_to_rad(sample.gyro.x) * dt;

        if (sample.accel.magnitude() - GRAVITY).abs() >= GRAVITY_TOLERANCE {
            return false;
        }

        let error = accel_pitch(sample.accel) - self.pitch;
        if error.abs() > DRIFT_ERROR_THRESHOLD {
            self.pitch += DRIFT_STEP * error;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample(gyro_x: f64, accel: Vec3) -> Sample {
        Sample {
            gyro: Vec3::new(gyro_x, 0.0, 0.0),
            accel,
            ..Sample::default()
        }
    }

    /// Gravity vector of magnitude exactly [`GRAVITY`] for a device pitched by `pitch`.
    fn gravity_at(pitch: f64) -> Vec3 {
        Vec3::new(-GRAVITY * pitch.sin(), 0.0, GRAVITY * pitch.cos())
    }

    #[test]
    fn test_first_update_only_primes() {
        let mut est = OrientationEstimate::new();
        let t0 = Instant::now();
        assert!(!est.update(&sample(1.0, Vec3::ZERO), t0));
        assert_eq!(est.pitch(), 0.0);
    }

    #[test]
    fn test_integrates_one_second_of_rate() {
        let mut est = OrientationEstimate::new();
        let t0 = Instant::now();

        // 100 Hz for exactly one second; the accelerometer agrees with the
        // integrated pitch at every step, so no correction applies.
        est.update(&sample(0.1, gravity_at(0.0)), t0);
        for k in 1..=100u64 {
            let t = t0 + Duration::from_millis(10 * k);
            let expected_so_far = 0.1 * (k as f64) * 0.01;
            let corrected = est.update(&sample(0.1, gravity_at(expected_so_far)), t);
            assert!(!corrected);
        }

        assert!((est.pitch() - 0.1).abs() < 1e-9, "pitch = {}", est.pitch());
    }

    #[test]
    fn test_degree_rates_converted() {
        let mut est = OrientationEstimate::new();
        let t0 = Instant::now();
        est.update(&sample(90.0, Vec3::ZERO), t0);
        est.update(&sample(90.0, Vec3::ZERO), t0 + Duration::from_millis(20));
        assert!((est.pitch() - 90f64.to_radians() * 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_dt_clamped_after_stall() {
        let mut est = OrientationEstimate::new();
        let t0 = Instant::now();
        est.update(&sample(1.0, Vec3::ZERO), t0);
        est.update(&sample(1.0, Vec3::ZERO), t0 + Duration::from_secs(5));
        assert!((est.pitch() - DT_MAX).abs() < 1e-12);
    }

    #[test]
    fn test_dt_floor_for_bursts() {
        let mut est = OrientationEstimate::new();
        let t0 = Instant::now();
        est.update(&sample(1.0, Vec3::ZERO), t0);
        est.update(&sample(1.0, Vec3::ZERO), t0);
        assert!((est.pitch() - DT_MIN).abs() < 1e-12);
    }

    #[test]
    fn test_drift_corrected_toward_gravity() {
        let mut est = OrientationEstimate::new();
        let t0 = Instant::now();
        est.update(&sample(0.0, gravity_at(0.0)), t0);

        // Device is level but the gyro estimate has drifted to 0.2 rad
        est.pitch = 0.2;
        let corrected = est.update(&sample(0.0, gravity_at(0.0)), t0 + Duration::from_millis(10));
        assert!(corrected);
        assert!((est.pitch() - (0.2 - DRIFT_STEP * 0.2)).abs() < 1e-12);

        // Repeated ticks converge until the error falls under the threshold
        for k in 2..2000u64 {
            est.update(&sample(0.0, gravity_at(0.0)), t0 + Duration::from_millis(10 * k));
        }
        assert!(est.pitch().abs() <= DRIFT_ERROR_THRESHOLD + 1e-9);
        assert!(est.pitch() > 0.0);
    }

    #[test]
    fn test_small_error_ignored() {
        let mut est = OrientationEstimate::new();
        let t0 = Instant::now();
        est.update(&sample(0.0, gravity_at(0.0)), t0);
        est.pitch = 0.02;
        assert!(!est.update(&sample(0.0, gravity_at(0.0)), t0 + Duration::from_millis(10)));
        assert_eq!(est.pitch(), 0.02);
    }

    #[test]
    fn test_no_correction_under_linear_acceleration() {
        let mut est = OrientationEstimate::new();
        let t0 = Instant::now();
        est.update(&sample(0.0, Vec3::ZERO), t0);
        est.pitch = 0.5;

        // Magnitude 15 m/s² is well outside the gravity band
        let shaken = Vec3::new(0.0, 0.0, 15.0);
        assert!(!est.update(&sample(0.0, shaken), t0 + Duration::from_millis(10)));
        assert_eq!(est.pitch(), 0.5);
    }

    #[test]
    fn test_accel_pitch_sign() {
        assert!(accel_pitch(gravity_at(0.3)) > 0.0);
        assert!((accel_pitch(gravity_at(0.3)) - 0.3).abs() < 1e-12);
        assert!((accel_pitch(gravity_at(-0.3)) + 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_accel_pitch_vertical_device() {
        // y and z both zero: denominator is floored instead of dividing by zero
        let p = accel_pitch(Vec3::new(-9.81, 0.0, 0.0));
        assert!((p - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
