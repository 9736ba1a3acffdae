//! # Motion Fusion Engine
//!
//! Runs one control tick for a device: orientation, recenter, pointer, swing,
//! in that order.
//!
//! ## Usage
//!
//! ```
//! use std::time::Instant;
//! use gyro_pad_bridge::motion::{FusionParams, MotionFusionEngine, MotionState};
//! use gyro_pad_bridge::protocol::messages::Sample;
//!
//! let engine = MotionFusionEngine::new(FusionParams::default());
//! let mut state = MotionState::default();
//! let frame = engine.frame(&mut state, &Sample::default(), Instant::now());
//! assert_eq!((frame.rx, frame.ry), (0, 0));
//! ```

use std::time::{Duration, Instant};

use super::gestures::{HoldGesture, SwingDetector};
use super::orientation::OrientationEstimate;
use super::pointer::{PointerParams, PointerState};
use crate::config::MotionConfig;
use crate::protocol::buttons::Button;
use crate::protocol::encoder::ControlFrame;
use crate::protocol::messages::Sample;

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionParams {
    pub pointer: PointerParams,
    /// How long HOME must be held to recenter.
    pub recenter_hold: Duration,
    /// Accelerometer x magnitude that counts as a swing.
    pub swing_threshold: f64,
    /// Minimum time between two swings.
    pub swing_cooldown: Duration,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            pointer: PointerParams::default(),
            recenter_hold: Duration::from_millis(600),
            swing_threshold: 2.3,
            swing_cooldown: Duration::from_millis(250),
        }
    }
}

impl From<&MotionConfig> for FusionParams {
    fn from(config: &MotionConfig) -> Self {
        Self {
            pointer: PointerParams {
                deadzone: config.pointer_deadzone,
                yaw_limit: config.yaw_limit,
                pitch_limit: config.pitch_limit,
                invert_rx: config.invert_rx,
                invert_ry: config.invert_ry,
            },
            recenter_hold: Duration::from_millis(config.recenter_hold_ms),
            swing_threshold: config.swing_threshold,
            swing_cooldown: Duration::from_millis(config.swing_cooldown_ms),
        }
    }
}

/// Per-device accumulator owned by the device's session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionState {
    pub orientation: OrientationEstimate,
    pub pointer: PointerState,
    recenter: HoldGesture,
    swing: SwingDetector,
}

/// Result of one fusion tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusionOutput {
    pub rx: i16,
    pub ry: i16,
    /// A swing was detected on this tick.
    pub swing: bool,
    /// The recenter gesture fired on this tick.
    pub recentered: bool,
}

/// Stateless fusion pipeline; all state lives in [`MotionState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionFusionEngine {
    params: FusionParams,
}

impl MotionFusionEngine {
    #[must_use]
    pub fn new(params: FusionParams) -> Self {
        Self { params }
    }

    /// Advances `state` by one control tick using the latest sample.
    pub fn step(&self, state: &mut MotionState, sample: &Sample, now: Instant) -> FusionOutput {
        state.orientation.update(sample, now);

        let home = sample.buttons.contains(Button::Home);
        let recentered = state.recenter.update(home, now, self.params.recenter_hold);
        if recentered {
            state.pointer.recenter();
        }

        state.pointer.update(sample.gyro, &self.params.pointer, now);
        let (rx, ry) = state.pointer.stick(&self.params.pointer);

        let swing = state.swing.update(
            sample.accel.x,
            now,
            self.params.swing_threshold,
            self.params.swing_cooldown,
        );

        FusionOutput { rx, ry, swing, recentered }
    }

    /// Runs [`step`](Self::step) and builds the driver frame. A swing
    /// presses A for this tick only.
    pub fn frame(&self, state: &mut MotionState, sample: &Sample, now: Instant) -> ControlFrame {
        let output = self.step(state, sample, now);

        let mut buttons = sample.buttons;
        if output.swing {
            buttons.insert(Button::A);
        }

        ControlFrame {
            buttons,
            rx: output.rx,
            ry: output.ry,
        }
    }
}
