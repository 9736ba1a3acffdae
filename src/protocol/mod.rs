//! # Wire Protocol Module
//!
//! JSON datagrams exchanged with the phone app, and the text control line
//! sent to the virtual controller driver.
//!
//! This module handles:
//! - Discovery announcements and pairing replies (server → device)
//! - Pairing requests and telemetry samples (device → server)
//! - Button naming, both on the wire and on the driver side
//! - Control line formatting for the driver sink

pub mod buttons;
pub mod decoder;
pub mod encoder;
pub mod messages;
