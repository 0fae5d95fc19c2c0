//! Echo-aware input injection and capture for remote-hand.
//!
//! The agent both injects input and watches the host's input stream, so it
//! sees its own injections come back. This crate tells the two apart:
//!
//! - [`InputState`] holds the shared bookkeeping under a single lock.
//! - [`InputEngine`] injects through a [`Platform`], registers the expected
//!   echoes, classifies raw events from an [`InputCapture`] source, and
//!   exposes the read-and-reset polls.
//!
//! Backends: evdev/uinput on Linux (`linux` feature) and in-memory mocks for
//! tests (`mock` feature).

use async_trait::async_trait;
use remote_hand_types::{PseudoKey, RawEvent};
use tokio::sync::mpsc;

pub mod engine;
pub mod error;
pub mod state;

#[cfg(feature = "linux")]
pub mod linux;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use engine::InputEngine;
pub use error::InputError;
pub use state::{InputState, KeyVerdict, MotionVerdict};

/// Platform key code produced by the key-symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u32);

/// What a key name resolves to on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTarget {
    /// An ordinary keyboard key.
    Key(KeyCode),
    /// A mouse button or wheel step.
    Pseudo(PseudoKey),
}

/// Injection and screen capture on the host.
///
/// One implementation exists per target platform; the engine never branches
/// on platform. Calls are expected to return promptly: they are made from
/// both the request loop and the capture task.
pub trait Platform: Send + Sync + 'static {
    /// Look up an ordinary key name. Pseudo-keys never reach this method.
    fn translate_key_name(&self, name: &str) -> Result<KeyCode, InputError>;

    /// The name the capture side reports for `name`.
    ///
    /// Platforms whose key table has aliases (`"shift"` and `"left shift"`
    /// on the same key) map every alias to one name so that an injected
    /// key's echo matches its expectation.
    fn canonical_key_name(&self, name: &str) -> String {
        name.to_string()
    }

    /// Press or release a key or button. For a wheel pseudo-key a press is
    /// one notch; the engine never releases a wheel.
    fn inject_key(&self, target: KeyTarget, down: bool) -> Result<(), InputError>;

    /// Move the pointer by a relative amount.
    fn inject_motion(&self, dx: i32, dy: i32) -> Result<(), InputError>;

    /// Capture a JPEG of the whole display (`target` empty) or of the named
    /// window.
    fn capture_image(&self, target: &str, quality: u8) -> Result<Vec<u8>, InputError>;

    /// Release platform resources.
    fn shutdown(&self) -> Result<(), InputError> {
        Ok(())
    }
}

/// Reports raw input events from the host.
///
/// Implementations watch physical (and virtual) devices and forward every
/// key edge and motion, echoes included, through a channel.
#[async_trait]
pub trait InputCapture: Send + 'static {
    /// Start capturing input, sending events to `tx`.
    async fn start(&mut self, tx: mpsc::Sender<RawEvent>) -> Result<(), InputError>;

    /// Stop capturing and release all resources.
    async fn shutdown(&mut self) -> Result<(), InputError>;
}
