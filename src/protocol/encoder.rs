//! # Datagram Encoder
//!
//! Encodes server replies as JSON and driver frames as control lines.

use std::fmt::Write;

use super::buttons::{Button, ButtonSet};
use super::messages::ServerMessage;
use crate::error::Result;

/// Full-scale stick value sent to the driver.
pub const STICK_MAX: i16 = 32767;

/// One control-loop output for the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFrame {
    pub buttons: ButtonSet,
    pub rx: i16,
    pub ry: i16,
}

/// Encode a server message as a JSON datagram
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn encode_message(message: &ServerMessage) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

/// Encode a control frame as the driver's text line
///
/// Every button appears once, in [`Button::ALL`] order, followed by the two
/// stick values.
///
/// # Examples
///
/// ```
/// use gyro_pad_bridge::protocol::buttons::{Button, ButtonSet};
/// use gyro_pad_bridge::protocol::encoder::{encode_control_line, ControlFrame};
///
/// let mut buttons = ButtonSet::new();
/// buttons.insert(Button::One);
/// let line = encode_control_line(&ControlFrame { buttons, rx: -5, ry: 7 });
/// assert!(line.starts_with("A=0,B=0,X=1,"));
/// assert!(line.ends_with(",RX=-5,RY=7"));
/// ```
pub fn encode_control_line(frame: &ControlFrame) -> String {
    let mut line = String::with_capacity(128);

    for button in Button::ALL {
        let pressed = u8::from(frame.buttons.contains(button));
        // Writing into a String cannot fail
        let _ = write!(line, "{}={},", button.driver_name(), pressed);
    }
    let _ = write!(line, "RX={},RY={}", frame.rx, frame.ry);

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::DenyReason;

    #[test]
    fn test_encode_idle_frame() {
        let line = encode_control_line(&ControlFrame::default());
        assert_eq!(
            line,
            "A=0,B=0,X=0,Y=0,START=0,BACK=0,GUIDE=0,UP=0,DOWN=0,LEFT=0,RIGHT=0,RX=0,RY=0"
        );
    }

    #[test]
    fn test_encode_pressed_buttons() {
        let buttons: ButtonSet = [Button::A, Button::Home, Button::Minus].into_iter().collect();
        let line = encode_control_line(&ControlFrame { buttons, rx: STICK_MAX, ry: -STICK_MAX });

        assert!(line.contains("A=1"));
        assert!(line.contains("GUIDE=1"));
        assert!(line.contains("BACK=1"));
        assert!(line.contains("START=0"));
        assert!(line.ends_with("RX=32767,RY=-32767"));
    }

    #[test]
    fn test_every_button_listed_once() {
        let line = encode_control_line(&ControlFrame::default());
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), Button::ALL.len() + 2);
        for button in Button::ALL {
            let prefix = format!("{}=", button.driver_name());
            assert_eq!(fields.iter().filter(|f| f.starts_with(&prefix)).count(), 1);
        }
    }

    #[test]
    fn test_encode_message() {
        let bytes = encode_message(&ServerMessage::PairDeny { reason: DenyReason::NoFreeSlots }).unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"{"type":"PAIR_DENY","reason":"NO_FREE_SLOTS"}"#
        );
    }
}
