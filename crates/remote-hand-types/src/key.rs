//! Key-name vocabulary.
//!
//! Keys travel as plain names (`"a"`, `"left shift"`, `"numpad 0"`). Mouse
//! buttons and the scroll wheel share the same namespace through reserved
//! pseudo-key names so that the whole protocol deals in one kind of key.

/// Mouse button addressed by a pseudo-key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Scroll wheel direction addressed by a pseudo-key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelDirection {
    Up,
    Down,
}

/// A reserved key name standing for a mouse button or a wheel step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoKey {
    Button(MouseButton),
    Wheel(WheelDirection),
}

impl PseudoKey {
    pub const MOUSE_LEFT: &'static str = "mouse left";
    pub const MOUSE_RIGHT: &'static str = "mouse right";
    pub const MOUSE_MIDDLE: &'static str = "mouse middle";
    pub const MOUSE_UP: &'static str = "mouse up";
    pub const MOUSE_DOWN: &'static str = "mouse down";

    /// Every pseudo-key, in a stable order.
    pub const ALL: [PseudoKey; 5] = [
        PseudoKey::Button(MouseButton::Left),
        PseudoKey::Button(MouseButton::Right),
        PseudoKey::Button(MouseButton::Middle),
        PseudoKey::Wheel(WheelDirection::Up),
        PseudoKey::Wheel(WheelDirection::Down),
    ];

    /// Parse a reserved name. Ordinary key names return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            Self::MOUSE_LEFT => Some(Self::Button(MouseButton::Left)),
            Self::MOUSE_RIGHT => Some(Self::Button(MouseButton::Right)),
            Self::MOUSE_MIDDLE => Some(Self::Button(MouseButton::Middle)),
            Self::MOUSE_UP => Some(Self::Wheel(WheelDirection::Up)),
            Self::MOUSE_DOWN => Some(Self::Wheel(WheelDirection::Down)),
            _ => None,
        }
    }

    /// The reserved name of this pseudo-key.
    pub fn name(self) -> &'static str {
        match self {
            Self::Button(MouseButton::Left) => Self::MOUSE_LEFT,
            Self::Button(MouseButton::Right) => Self::MOUSE_RIGHT,
            Self::Button(MouseButton::Middle) => Self::MOUSE_MIDDLE,
            Self::Wheel(WheelDirection::Up) => Self::MOUSE_UP,
            Self::Wheel(WheelDirection::Down) => Self::MOUSE_DOWN,
        }
    }
}

impl std::fmt::Display for PseudoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
