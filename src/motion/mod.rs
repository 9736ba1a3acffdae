//! # Motion Fusion Module
//!
//! Turns raw gyroscope/accelerometer samples into stick axes and gestures.
//!
//! This module handles:
//! - Drift-corrected absolute pitch (complementary filter)
//! - Pointer yaw/pitch integration with deadzone and travel limits
//! - HOME-hold recenter gesture
//! - Swing gesture (synthetic confirm press)
//!
//! Nothing here performs I/O. Every update takes the current time as an
//! argument so the whole pipeline can be driven deterministically.

pub mod fusion;
pub mod gestures;
pub mod orientation;
pub mod pointer;

pub use fusion::{FusionOutput, FusionParams, MotionFusionEngine, MotionState};

/// Gyro readings above this magnitude are assumed to be in degrees/s.
pub const DEGREE_UNITS_THRESHOLD: f64 = 20.0;

/// Converts a gyro rate to rad/s when its magnitude suggests degree units.
///
/// # Examples
///
/// ```
/// use gyro_pad_bridge::motion::maybe_deg_to_rad;
///
/// assert_eq!(maybe_deg_to_rad(0.5), 0.5);
/// assert!((maybe_deg_to_rad(180.0) - std::f64::consts::PI).abs() < 1e-12);
/// ```
#[must_use]
pub fn maybe_deg_to_rad(rate: f64) -> f64 {
    if rate.abs() > DEGREE_UNITS_THRESHOLD {
        rate.to_radians()
    } else {
        rate
    }
}

/// Seconds elapsed since `last`, clamped to `[min, max]`.
pub(crate) fn clamped_dt(last: std::time::Instant, now: std::time::Instant, min: f64, max: f64) -> f64 {
    now.saturating_duration_since(last)
        .as_secs_f64()
        .clamp(min, max)
}
