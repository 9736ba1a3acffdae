//! # Buttons
//!
//! The eleven buttons a device can report, and the fixed mapping from their
//! wire names to the names the driver expects.
//!
//! | Wire | Driver |
//! |------|--------|
//! | A | A |
//! | B | B |
//! | 1 | X |
//! | 2 | Y |
//! | + | START |
//! | - | BACK |
//! | HOME | GUIDE |
//! | UP / DOWN / LEFT / RIGHT | same |

use std::collections::HashMap;

use serde_json::Value;

/// A physical button on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    One,
    Two,
    Plus,
    Minus,
    Home,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    /// Every button, in control-line order.
    pub const ALL: [Button; 11] = [
        Button::A,
        Button::B,
        Button::One,
        Button::Two,
        Button::Plus,
        Button::Minus,
        Button::Home,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];

    /// Name used in telemetry datagrams.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::One => "1",
            Button::Two => "2",
            Button::Plus => "+",
            Button::Minus => "-",
            Button::Home => "HOME",
            Button::Up => "UP",
            Button::Down => "DOWN",
            Button::Left => "LEFT",
            Button::Right => "RIGHT",
        }
    }

    /// Name used in the driver control line.
    #[must_use]
    pub fn driver_name(self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::One => "X",
            Button::Two => "Y",
            Button::Plus => "START",
            Button::Minus => "BACK",
            Button::Home => "GUIDE",
            Button::Up => "UP",
            Button::Down => "DOWN",
            Button::Left => "LEFT",
            Button::Right => "RIGHT",
        }
    }

    #[must_use]
    pub fn from_wire_name(name: &str) -> Option<Button> {
        Button::ALL.into_iter().find(|b| b.wire_name() == name)
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of pressed buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonSet(u16);

impl ButtonSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set from a telemetry button map.
    ///
    /// Unknown names are ignored. A value counts as pressed when it is a
    /// non-zero number, `true`, or the string `"1"`.
    #[must_use]
    pub fn from_wire(map: &HashMap<String, Value>) -> Self {
        let mut set = Self::new();
        for (name, value) in map {
            if let Some(button) = Button::from_wire_name(name) {
                if is_pressed(value) {
                    set.insert(button);
                }
            }
        }
        set
    }

    pub fn insert(&mut self, button: Button) {
        self.0 |= button.bit();
    }

    #[must_use]
    pub fn contains(&self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }
}

impl FromIterator<Button> for ButtonSet {
    fn from_iter<I: IntoIterator<Item = Button>>(iter: I) -> Self {
        let mut set = ButtonSet::new();
        for button in iter {
            set.insert(button);
        }
        set
    }
}

fn is_pressed(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |v| v != 0.0),
        Value::String(s) => s == "1",
        _ => false,
    }
}
