//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; anything left out falls back
//! to the defaults below, which match the ports and tuning the phone app
//! expects out of the box.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::session::MAX_SLOTS;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub instance: InstanceConfig,
}

/// Listening ports and discovery broadcast settings
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,

    #[serde(default = "default_pair_port")]
    pub pair_port: u16,

    #[serde(default = "default_data_port")]
    pub data_port: u16,

    #[serde(default = "default_broadcast_addr")]
    pub broadcast_addr: String,

    #[serde(default = "default_discovery_interval_ms")]
    pub discovery_interval_ms: u64,
}

/// Slot liveness and statistics timing
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,

    #[serde(default = "default_eviction_interval_ms")]
    pub eviction_interval_ms: u64,

    #[serde(default = "default_stats_interval_ms")]
    pub stats_interval_ms: u64,

    /// Number of stats windows between status log lines (0 disables)
    #[serde(default = "default_status_log_windows")]
    pub status_log_windows: u32,
}

/// Pointer and gesture tuning
#[derive(Debug, Deserialize, Clone)]
pub struct MotionConfig {
    #[serde(default = "default_invert")]
    pub invert_rx: bool,

    #[serde(default = "default_invert")]
    pub invert_ry: bool,

    #[serde(default = "default_pointer_deadzone")]
    pub pointer_deadzone: f64,

    #[serde(default = "default_yaw_limit")]
    pub yaw_limit: f64,

    #[serde(default = "default_pitch_limit")]
    pub pitch_limit: f64,

    #[serde(default = "default_recenter_hold_ms")]
    pub recenter_hold_ms: u64,

    #[serde(default = "default_swing_threshold")]
    pub swing_threshold: f64,

    #[serde(default = "default_swing_cooldown_ms")]
    pub swing_cooldown_ms: u64,
}

/// External driver sink settings
#[derive(Debug, Deserialize, Clone)]
pub struct DriverConfig {
    #[serde(default = "default_driver_addr")]
    pub addr: String,

    #[serde(default = "default_rate_hz")]
    pub rate_hz: u32,

    #[serde(default)]
    pub active_slot: usize,
}

/// Log output settings
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Optional log file, written in addition to stdout
    #[serde(default)]
    pub file: Option<String>,
}

/// Single-instance guard settings
#[derive(Debug, Deserialize, Clone)]
pub struct InstanceConfig {
    /// Lock file holding the PID of the running server
    #[serde(default = "default_lock_file")]
    pub lock_file: String,
}

// Default value functions
fn default_bind_addr() -> String { "0.0.0.0".to_string() }
fn default_discovery_port() -> u16 { 5006 }
fn default_pair_port() -> u16 { 5007 }
fn default_data_port() -> u16 { 5005 }
fn default_broadcast_addr() -> String { "255.255.255.255".to_string() }
fn default_discovery_interval_ms() -> u64 { 1000 }

fn default_liveness_timeout_ms() -> u64 { 2000 }
fn default_eviction_interval_ms() -> u64 { 500 }
fn default_stats_interval_ms() -> u64 { 1000 }
fn default_status_log_windows() -> u32 { 5 }

fn default_invert() -> bool { true }
fn default_pointer_deadzone() -> f64 { 0.015 }
fn default_yaw_limit() -> f64 { 0.6 }
fn default_pitch_limit() -> f64 { 0.45 }
fn default_recenter_hold_ms() -> u64 { 600 }
fn default_swing_threshold() -> f64 { 2.3 }
fn default_swing_cooldown_ms() -> u64 { 250 }

fn default_driver_addr() -> String { "127.0.0.1:9876".to_string() }
fn default_rate_hz() -> u32 { 120 }

fn default_lock_file() -> String { "gyro-pad-bridge.lock".to_string() }

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            discovery_port: default_discovery_port(),
            pair_port: default_pair_port(),
            data_port: default_data_port(),
            broadcast_addr: default_broadcast_addr(),
            discovery_interval_ms: default_discovery_interval_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            liveness_timeout_ms: default_liveness_timeout_ms(),
            eviction_interval_ms: default_eviction_interval_ms(),
            stats_interval_ms: default_stats_interval_ms(),
            status_log_windows: default_status_log_windows(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            invert_rx: default_invert(),
            invert_ry: default_invert(),
            pointer_deadzone: default_pointer_deadzone(),
            yaw_limit: default_yaw_limit(),
            pitch_limit: default_pitch_limit(),
            recenter_hold_ms: default_recenter_hold_ms(),
            swing_threshold: default_swing_threshold(),
            swing_cooldown_ms: default_swing_cooldown_ms(),
        }
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            lock_file: default_lock_file(),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            addr: default_driver_addr(),
            rate_hz: default_rate_hz(),
            active_slot: 0,
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(msg))
}

impl NetworkConfig {
    /// Address the pairing and telemetry listeners bind to for `port`.
    pub fn listen_addr(&self, port: u16) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind_addr
            .parse()
            .map_err(|_| invalid(format!("bind_addr '{}' is not an IP address", self.bind_addr)))?;
        Ok(SocketAddr::new(ip, port))
    }

    /// Destination of discovery announcements.
    pub fn broadcast_target(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.broadcast_addr.parse().map_err(|_| {
            invalid(format!("broadcast_addr '{}' is not an IP address", self.broadcast_addr))
        })?;
        Ok(SocketAddr::new(ip, self.discovery_port))
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }
}

impl SessionConfig {
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_millis(self.eviction_interval_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }
}

impl DriverConfig {
    /// Loopback endpoint of the virtual controller driver.
    pub fn target(&self) -> Result<SocketAddr> {
        self.addr
            .parse()
            .map_err(|_| invalid(format!("driver addr '{}' is not a socket address", self.addr)))
    }

    /// Period of the control loop.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.rate_hz.max(1)))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gyro_pad_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        let net = &self.network;
        net.listen_addr(net.pair_port)?;
        net.broadcast_target()?;
        self.driver.target()?;

        for (name, port) in [
            ("discovery_port", net.discovery_port),
            ("pair_port", net.pair_port),
            ("data_port", net.data_port),
        ] {
            if port == 0 {
                return Err(invalid(format!("{} must be greater than 0", name)));
            }
        }

        if net.pair_port == net.data_port {
            return Err(invalid("pair_port and data_port must differ"));
        }

        if net.discovery_interval_ms == 0 || net.discovery_interval_ms > 60000 {
            return Err(invalid("discovery_interval_ms must be between 1 and 60000"));
        }

        // Timing fields
        for (name, value) in [
            ("liveness_timeout_ms", self.session.liveness_timeout_ms),
            ("eviction_interval_ms", self.session.eviction_interval_ms),
            ("stats_interval_ms", self.session.stats_interval_ms),
        ] {
            if value == 0 || value > 60000 {
                return Err(invalid(format!("{} must be between 1 and 60000", name)));
            }
        }

        if self.session.eviction_interval_ms > self.session.liveness_timeout_ms {
            return Err(invalid("eviction_interval_ms must not exceed liveness_timeout_ms"));
        }

        // Motion tuning
        let motion = &self.motion;
        if !(0.0..=0.5).contains(&motion.pointer_deadzone) {
            return Err(invalid("pointer_deadzone must be between 0.0 and 0.5"));
        }

        for (name, value) in [("yaw_limit", motion.yaw_limit), ("pitch_limit", motion.pitch_limit)] {
            if !(value > 0.0 && value <= std::f64::consts::PI) {
                return Err(invalid(format!("{} must be in (0, pi]", name)));
            }
        }

        if motion.recenter_hold_ms == 0 || motion.recenter_hold_ms > 10000 {
            return Err(invalid("recenter_hold_ms must be between 1 and 10000"));
        }

        if !(motion.swing_threshold > 0.0) {
            return Err(invalid("swing_threshold must be greater than 0"));
        }

        if motion.swing_cooldown_ms > 10000 {
            return Err(invalid("swing_cooldown_ms must be at most 10000"));
        }

        // Driver loop
        if self.driver.rate_hz == 0 || self.driver.rate_hz > 1000 {
            return Err(invalid("rate_hz must be between 1 and 1000"));
        }

        if self.instance.lock_file.trim().is_empty() {
            return Err(invalid("instance lock_file must not be empty"));
        }

        if self.driver.active_slot >= MAX_SLOTS {
            return Err(invalid(format!(
                "active_slot {} is out of bounds (must be 0-{})",
                self.driver.active_slot,
                MAX_SLOTS - 1
            )));
        }

        if let Some(file) = &self.logging.file {
            if file.trim().is_empty() {
                return Err(invalid("logging file cannot be empty when set"));
            }
        }

        Ok(())
    }
}
