//! Protocol message types.
//!
//! The client sends one [`Request`] per frame and the agent answers each
//! well-formed request with exactly one [`Response`].

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Highest meaningful JPEG quality.
pub const MAX_QUALITY: u8 = 100;

/// Relative mouse motion requested by the client.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode,
)]
pub struct MouseMotion {
    pub dx: i32,
    pub dy: i32,
}

impl MouseMotion {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// A zero motion means "do not move the mouse".
    pub fn is_zero(self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// Accumulated genuine mouse movement reported back to the client.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode,
)]
pub struct MousePosition {
    pub x: i32,
    pub y: i32,
}

impl From<(i32, i32)> for MousePosition {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// A single command from the controlling client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Request {
    /// Keys (or pseudo-keys) to press, in order.
    pub press_keys: Vec<String>,
    /// Keys (or pseudo-keys) to release, in order, after all presses.
    pub release_keys: Vec<String>,
    /// Relative mouse motion; zero means no motion.
    pub mouse: MouseMotion,
    /// Skip injection while the human is holding a key or button.
    pub allow_user_override: bool,
    /// Attach a JPEG screenshot to the response.
    pub get_image: bool,
    /// Window/process to capture; empty captures the whole display.
    pub process_name: String,
    /// JPEG quality, 0..=100. Larger values are clamped.
    pub quality: u32,
    /// Attach the genuine keys pressed since the previous poll.
    pub get_keys: bool,
    /// Attach the genuine mouse movement since the previous poll.
    pub get_mouse: bool,
}

impl Request {
    /// The requested JPEG quality, clamped to `0..=100`.
    pub fn clamped_quality(&self) -> u8 {
        u8::try_from(self.quality.min(u32::from(MAX_QUALITY))).unwrap_or(MAX_QUALITY)
    }
}

/// The agent's answer to one [`Request`].
///
/// Each field is present only when the matching `get_*` flag was set (and,
/// for the image, only when the capture succeeded).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Response {
    pub image: Option<Vec<u8>>,
    pub pressed_keys: Option<Vec<String>>,
    pub mouse: Option<MousePosition>,
}
