//! # Protocol Messages
//!
//! Serde types for every JSON datagram on the wire.

use std::collections::HashMap;
use std::fmt;

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::buttons::ButtonSet;

/// `type` tag of a pairing request.
pub const PAIR_REQUEST_TYPE: &str = "PAIR_REQUEST";

/// Longest display name kept from a pairing request, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Name used when a pairing request carries no username.
pub const DEFAULT_DISPLAY_NAME: &str = "Phone";

/// Three-axis sensor reading.
///
/// Decodes only from a JSON object; missing axes are zero and extra keys are
/// ignored. Arrays such as `[1, 2, 3]` are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length of the vector.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl<'de> Deserialize<'de> for Vec3 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Vec3Visitor;

        impl<'de> Visitor<'de> for Vec3Visitor {
            type Value = Vec3;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object with x, y and z")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Vec3, A::Error> {
                let mut v = Vec3::ZERO;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "x" => v.x = map.next_value()?,
                        "y" => v.y = map.next_value()?,
                        "z" => v.z = map.next_value()?,
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(v)
            }
        }

        deserializer.deserialize_map(Vec3Visitor)
    }
}

/// Machine-readable reason carried by `PAIR_DENY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    NoFreeSlots,
}

/// Datagrams sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Periodic broadcast announcing the pairing and telemetry ports.
    #[serde(rename = "DISCOVERY")]
    Discovery { pair_port: u16, data_port: u16 },

    #[serde(rename = "PAIR_ACCEPT")]
    PairAccept {
        slot: usize,
        token: String,
        data_port: u16,
    },

    #[serde(rename = "PAIR_DENY")]
    PairDeny { reason: DenyReason },

    /// Part of the client-facing protocol; this server always answers
    /// synchronously and never sends it.
    #[serde(rename = "PAIR_PENDING")]
    PairPending,
}

/// Pairing request as received from a device.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PairRequest {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub device_id: String,

    #[serde(default)]
    pub username: Option<String>,

    /// Device clock at send time, epoch seconds.
    #[serde(default)]
    pub ts: Option<f64>,
}

/// One motion/button sample from a paired device.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelemetryPacket {
    #[serde(default)]
    pub device_id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub accel: Vec3,

    #[serde(default)]
    pub gyro: Vec3,

    /// Raw button map; values are normally 0/1 but booleans are accepted.
    #[serde(default)]
    pub buttons: HashMap<String, serde_json::Value>,

    /// Client timestamp. Not used for ordering.
    #[serde(default)]
    pub ts: Option<f64>,
}

/// Latest decoded sensor and button state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub buttons: ButtonSet,
    pub gyro: Vec3,
    pub accel: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vec3_from_object() {
        let v: Vec3 = serde_json::from_value(json!({"x": 1, "z": -2.5, "w": "ignored"})).unwrap();
        assert_eq!(v, Vec3::new(1.0, 0.0, -2.5));
    }

    #[test]
    fn test_vec3_rejects_array_and_scalar() {
        assert!(serde_json::from_value::<Vec3>(json!([1, 2, 3])).is_err());
        assert!(serde_json::from_value::<Vec3>(json!(9.81)).is_err());
        assert!(serde_json::from_value::<Vec3>(json!({"x": "fast"})).is_err());
    }

    #[test]
    fn test_discovery_wire_shape() {
        let msg = ServerMessage::Discovery { pair_port: 5007, data_port: 5005 };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "DISCOVERY", "pair_port": 5007, "data_port": 5005}));
    }

    #[test]
    fn test_pair_accept_wire_shape() {
        let msg = ServerMessage::PairAccept {
            slot: 2,
            token: "abc".to_string(),
            data_port: 5005,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "PAIR_ACCEPT", "slot": 2, "token": "abc", "data_port": 5005})
        );
    }

    #[test]
    fn test_pair_deny_wire_shape() {
        let msg = ServerMessage::PairDeny { reason: DenyReason::NoFreeSlots };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "PAIR_DENY", "reason": "NO_FREE_SLOTS"}));
    }

    #[test]
    fn test_pair_pending_parses() {
        let msg: ServerMessage = serde_json::from_str(r#"{"type":"PAIR_PENDING"}"#).unwrap();
        assert_eq!(msg, ServerMessage::PairPending);
    }

    #[test]
    fn test_vec3_missing_axes_default_to_zero() {
        let v: Vec3 = serde_json::from_str(r#"{"x": 1.5}"#).unwrap();
        assert_eq!(v, Vec3::new(1.5, 0.0, 0.0));
    }

    #[test]
    fn test_vec3_magnitude() {
        assert!((Vec3::new(3.0, 4.0, 0.0).magnitude() - 5.0).abs() < 1e-12);
        assert_eq!(Vec3::ZERO.magnitude(), 0.0);
    }

    #[test]
    fn test_telemetry_defaults() {
        let packet: TelemetryPacket =
            serde_json::from_str(r#"{"device_id": "abc", "token": "t"}"#).unwrap();
        assert_eq!(packet.accel, Vec3::ZERO);
        assert_eq!(packet.gyro, Vec3::ZERO);
        assert!(packet.buttons.is_empty());
        assert!(packet.ts.is_none());
    }
}
