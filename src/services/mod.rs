//! # Services Module
//!
//! The long-running loops that make up the server. Each owns its own
//! socket or timer and shares only the [`SessionRegistry`](crate::session::SessionRegistry)
//! and the active slot.
//!
//! Every `run` method returns when the shutdown token is cancelled.

pub mod discovery;
pub mod driver;
pub mod liveness;
pub mod pairing;
pub mod telemetry;

pub use discovery::DiscoveryBroadcaster;
pub use driver::DriverEmitter;
pub use liveness::LivenessMonitor;
pub use pairing::PairingService;
pub use telemetry::TelemetryIngestor;
