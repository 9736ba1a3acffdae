//! # Gyro Pad Bridge Library
//!
//! Turn a phone into a motion controller for a virtual gamepad.
//!
//! Phones find the server through UDP discovery broadcasts, pair into one
//! of four slots, and stream motion and button telemetry. The active slot's
//! telemetry is fused into stick deflection and buttons and sent to an
//! external virtual-controller driver as one text line per tick.

pub mod config;
pub mod error;
pub mod instance;
pub mod motion;
pub mod net;
pub mod protocol;
pub mod server;
pub mod services;
pub mod session;
