//! # Session Module
//!
//! Server-side connection slots for paired devices.
//!
//! This module handles:
//! - The fixed slot table and its allocation rules
//! - Session token issue and validation
//! - Liveness eviction and per-slot sample-rate statistics
//! - The externally selected active slot

pub mod active;
pub mod registry;

pub use active::ActiveSlot;
pub use registry::{Pairing, Session, SessionRegistry, SessionSummary, SlotStatus};

/// Number of device slots.
pub const MAX_SLOTS: usize = 4;
