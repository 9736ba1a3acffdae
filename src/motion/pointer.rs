//! # Pointer Axes
//!
//! Integrates gyro rates into a bounded yaw/pitch pointer and maps it onto
//! the right stick.
//!
//! This integrator is independent of [`super::orientation`]: it keeps its
//! own timestamp and its own accumulators, so drift correction never moves
//! the pointer.

use std::time::Instant;

use super::{clamped_dt, maybe_deg_to_rad};
use crate::protocol::encoder::STICK_MAX;
use crate::protocol::messages::Vec3;

/// Shortest pointer integration step, seconds.
pub const DT_MIN: f64 = 0.001;
/// Longest pointer integration step, seconds.
pub const DT_MAX: f64 = 0.05;

/// Tuning for the pointer integrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerParams {
    /// Rates below this magnitude (rad/s) are treated as zero.
    pub deadzone: f64,
    /// Yaw travel limit, radians. Full stick deflection.
    pub yaw_limit: f64,
    /// Pitch travel limit, radians. Full stick deflection.
    pub pitch_limit: f64,
    pub invert_rx: bool,
    pub invert_ry: bool,
}

impl Default for PointerParams {
    fn default() -> Self {
        Self {
            deadzone: 0.015,
            yaw_limit: 0.6,
            pitch_limit: 0.45,
            invert_rx: true,
            invert_ry: true,
        }
    }
}

fn apply_deadzone(rate: f64, deadzone: f64) -> f64 {
    if rate.abs() < deadzone {
        0.0
    } else {
        rate
    }
}

/// Maps a normalized axis (-1.0 to 1.0) to a stick value, truncating toward zero.
fn to_stick(normalized: f64) -> i16 {
    (normalized.clamp(-1.0, 1.0) * f64::from(STICK_MAX)) as i16
}

/// Running pointer angles and their recenter reference.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    last_update: Option<Instant>,
    yaw: f64,
    pitch: f64,
    yaw0: f64,
    pitch0: f64,
}

impl PointerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated yaw, radians.
    #[must_use]
    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    /// Accumulated pitch, radians.
    #[must_use]
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Zero reference captured by the last recenter, as `(yaw0, pitch0)`.
    #[must_use]
    pub fn reference(&self) -> (f64, f64) {
        (self.yaw0, self.pitch0)
    }

    /// Makes the current pointer position the new stick center.
    pub fn recenter(&mut self) {
        self.yaw0 = self.yaw;
        self.pitch0 = self.pitch;
    }

    /// Integrates gyro x into yaw and gyro y into pitch.
    ///
    /// The first call only records `now`.
    pub fn update(&mut self, gyro: Vec3, params: &PointerParams, now: Instant) {
        let Some(last) = self.last_update.replace(now) else {
            return;
        };

        let dt = clamped_dt(last, now, DT_MIN, DT_MAX);
        let yaw_rate = apply_deadzone(maybe_deg_to_rad(gyro.x), params.deadzone);
        let pitch_rate = apply_deadzone(maybe_deg_to_rad(gyro.y), params.deadzone);

        self.yaw = (self.yaw + yaw_rate * dt).clamp(-params.yaw_limit, params.yaw_limit);
        self.pitch = (self.pitch + pitch_rate * dt).clamp(-params.pitch_limit, params.pitch_limit);
    }

    /// Stick values `(rx, ry)` for the current pointer position.
    ///
    /// The offset from the recenter reference is clamped to the travel
    /// limits before normalizing. Pitch is negated so that tilting up
    /// pushes the stick up before inversion flags apply.
    #[must_use]
    pub fn stick(&self, params: &PointerParams) -> (i16, i16) {
        let yaw = (self.yaw - self.yaw0).clamp(-params.yaw_limit, params.yaw_limit);
        let pitch = (self.pitch - self.pitch0).clamp(-params.pitch_limit, params.pitch_limit);

        let mut rx = yaw / params.yaw_limit;
        let mut ry = -pitch / params.pitch_limit;

        if params.invert_rx {
            rx = -rx;
        }
        if params.invert_ry {
            ry = -ry;
        }

        (to_stick(rx), to_stick(ry))
    }
}
