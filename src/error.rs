//! # Error Types
//!
//! Custom error types for Gyro Pad Bridge using `thiserror`.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for Gyro Pad Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Wire protocol errors (wrong message type, missing fields)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Undecodable JSON datagrams
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Every slot is occupied by another device
    #[error("No free controller slots")]
    NoFreeSlots,

    /// Slot index outside the slot table
    #[error("Invalid slot index {0}")]
    InvalidSlot(usize),

    /// A service could not bind its listening socket
    #[error("{service} failed to bind {addr}: {source}")]
    Bind {
        service: &'static str,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Another server process holds the instance lock
    #[error(
        "Server already running (PID {}, lock file {})",
        .pid.map_or_else(|| "unknown".to_string(), |pid| pid.to_string()),
        .path.display()
    )]
    AlreadyRunning { pid: Option<u32>, path: PathBuf },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Gyro Pad Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
