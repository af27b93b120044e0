use serde::{Deserialize, Serialize};
use std::fmt;

const GAMEPAD_BUTTON_PREFIX: &str = "gamepad_button_";
const GAMEPAD_AXIS_PREFIX: &str = "gamepad_axis_";

/// Identifier of a logical input: a keyboard key or a gamepad control.
///
/// Keys are always stored lower-cased, so `"A"` and `"a"` name the same binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BindingKey(String);

/// Classification of a [`BindingKey`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Keyboard,
    GamepadButton(usize),
    GamepadAxis(usize),
}

impl BindingKey {
    pub fn keyboard(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    pub fn gamepad_button(index: usize) -> Self {
        Self(format!("{GAMEPAD_BUTTON_PREFIX}{index}"))
    }

    pub fn gamepad_axis(index: usize) -> Self {
        Self(format!("{GAMEPAD_AXIS_PREFIX}{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Anything that is not a well-formed gamepad key counts as a keyboard key.
    pub fn kind(&self) -> KeyKind {
        if let Some(index) = parse_index(&self.0, GAMEPAD_BUTTON_PREFIX) {
            KeyKind::GamepadButton(index)
        } else if let Some(index) = parse_index(&self.0, GAMEPAD_AXIS_PREFIX) {
            KeyKind::GamepadAxis(index)
        } else {
            KeyKind::Keyboard
        }
    }

    pub fn is_axis(&self) -> bool {
        matches!(self.kind(), KeyKind::GamepadAxis(_))
    }
}

fn parse_index(raw: &str, prefix: &str) -> Option<usize> {
    raw.strip_prefix(prefix)?.parse().ok()
}

impl From<String> for BindingKey {
    fn from(value: String) -> Self {
        Self(value.to_lowercase())
    }
}

impl From<&str> for BindingKey {
    fn from(value: &str) -> Self {
        Self::keyboard(value)
    }
}

impl From<BindingKey> for String {
    fn from(value: BindingKey) -> Self {
        value.0
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
