//! # Datagram Decoder
//!
//! Decodes and normalizes datagrams received from devices.

use super::buttons::ButtonSet;
use super::messages::*;
use crate::error::{BridgeError, Result};

/// A pairing request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PairingRequest {
    pub device_id: String,
    /// Trimmed and truncated to [`MAX_DISPLAY_NAME_CHARS`].
    pub display_name: String,
    pub ts: Option<f64>,
}

/// A telemetry datagram that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub device_id: String,
    pub token: String,
    pub sample: Sample,
}

/// Decode a pairing request datagram
///
/// # Errors
///
/// Returns error if:
/// - The datagram is not valid JSON of the expected shape
/// - The `type` tag is not `PAIR_REQUEST`
/// - `device_id` is missing or blank
///
/// # Examples
///
/// ```
/// use gyro_pad_bridge::protocol::decoder::decode_pair_request;
///
/// let req = decode_pair_request(br#"{"type":"PAIR_REQUEST","device_id":"abc","username":"Phone1","ts":1000}"#)?;
/// assert_eq!(req.device_id, "abc");
/// assert_eq!(req.display_name, "Phone1");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn decode_pair_request(datagram: &[u8]) -> Result<PairingRequest> {
    let raw: PairRequest = serde_json::from_slice(datagram)?;

    if raw.kind != PAIR_REQUEST_TYPE {
        return Err(BridgeError::Protocol(format!(
            "Unexpected message type: {:?}",
            raw.kind
        )));
    }

    let device_id = raw.device_id.trim();
    if device_id.is_empty() {
        return Err(BridgeError::Protocol("Empty device_id".to_string()));
    }

    let display_name = raw
        .username
        .as_deref()
        .map(str::trim)
        .unwrap_or(DEFAULT_DISPLAY_NAME)
        .chars()
        .take(MAX_DISPLAY_NAME_CHARS)
        .collect();

    Ok(PairingRequest {
        device_id: device_id.to_string(),
        display_name,
        ts: raw.ts,
    })
}

/// Decode a telemetry datagram
///
/// # Errors
///
/// Returns error if the datagram is not valid JSON of the expected shape,
/// or if `device_id` or `token` is blank.
pub fn decode_telemetry(datagram: &[u8]) -> Result<Telemetry> {
    let raw: TelemetryPacket = serde_json::from_slice(datagram)?;

    let device_id = raw.device_id.trim();
    let token = raw.token.trim();
    if device_id.is_empty() || token.is_empty() {
        return Err(BridgeError::Protocol(
            "Telemetry without device_id or token".to_string(),
        ));
    }

    Ok(Telemetry {
        device_id: device_id.to_string(),
        token: token.to_string(),
        sample: Sample {
            buttons: ButtonSet::from_wire(&raw.buttons),
            gyro: raw.gyro,
            accel: raw.accel,
        },
    })
}
