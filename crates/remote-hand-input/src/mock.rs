//! Mock input backends for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use remote_hand_types::{PseudoKey, RawEvent};
use tokio::sync::mpsc;

use crate::error::InputError;
use crate::{InputCapture, KeyCode, KeyTarget, Platform};

// ---------------------------------------------------------------------------
// MockCapture
// ---------------------------------------------------------------------------

/// Mock input capture backend for testing.
///
/// Returns a `mpsc::Sender<RawEvent>` that tests use to feed events. When
/// `start()` is called, it spawns a task that forwards fed events to the
/// agent's capture channel.
pub struct MockCapture {
    feed_rx: Option<mpsc::Receiver<RawEvent>>,
    shutdown: Arc<AtomicBool>,
}

impl MockCapture {
    /// Create a new mock capture and a sender for feeding events.
    pub fn new() -> (Self, mpsc::Sender<RawEvent>) {
        let (feed_tx, feed_rx) = mpsc::channel(1024);
        let capture = Self {
            feed_rx: Some(feed_rx),
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        (capture, feed_tx)
    }

    /// Check if `shutdown()` was called.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InputCapture for MockCapture {
    async fn start(&mut self, tx: mpsc::Sender<RawEvent>) -> Result<(), InputError> {
        let mut feed_rx = self
            .feed_rx
            .take()
            .ok_or_else(|| InputError::Other(anyhow::anyhow!("MockCapture already started")))?;
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            while let Some(event) = feed_rx.recv().await {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), InputError> {
        self.shutdown.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockPlatform
// ---------------------------------------------------------------------------

/// Named keys understood by the mock besides letters and digits.
const NAMED_KEYS: &[&str] = &[
    "backspace",
    "tab",
    "enter",
    "esc",
    "space",
    "left shift",
    "right shift",
    "left ctrl",
    "right ctrl",
    "left alt",
    "right alt",
    "left",
    "up",
    "right",
    "down",
    "delete",
    "f1",
    "f5",
];

/// Alias names and the canonical name the capture side reports for them.
const ALIASES: &[(&str, &str)] = &[
    ("shift", "left shift"),
    ("ctrl", "left ctrl"),
    ("alt", "left alt"),
];

/// JPEG bytes returned for the whole display unless a test overrides them.
pub const DISPLAY_IMAGE: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

/// Recorded platform call for test observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injected {
    Key { target: KeyTarget, down: bool },
    Motion { dx: i32, dy: i32 },
}

#[derive(Debug)]
struct MockPlatformState {
    keys: Vec<String>,
    injected: Vec<Injected>,
    images: HashMap<String, Vec<u8>>,
    fail_injection: bool,
    echo: Option<mpsc::Sender<RawEvent>>,
    shutdown: bool,
}

/// Mock platform for testing.
///
/// Knows `a`-`z`, `0`-`9` and a handful of named keys. Records every
/// injection and can optionally echo it back through a capture feed, the way
/// a real host reports injected input.
pub struct MockPlatform {
    state: Arc<Mutex<MockPlatformState>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    /// Create a new mock platform.
    pub fn new() -> Self {
        let keys = ('a'..='z')
            .chain('0'..='9')
            .map(String::from)
            .chain(NAMED_KEYS.iter().map(|k| (*k).to_string()))
            .collect();
        let mut images = HashMap::new();
        images.insert(String::new(), DISPLAY_IMAGE.to_vec());
        Self {
            state: Arc::new(Mutex::new(MockPlatformState {
                keys,
                injected: Vec::new(),
                images,
                fail_injection: false,
                echo: None,
                shutdown: false,
            })),
        }
    }

    /// Echo every injection to `feed`, typically a [`MockCapture`] sender.
    pub fn with_echo(self, feed: mpsc::Sender<RawEvent>) -> Self {
        self.state.lock().unwrap().echo = Some(feed);
        self
    }

    /// Get a clonable handle for observing the platform from tests.
    pub fn handle(&self) -> MockPlatformHandle {
        MockPlatformHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn key_name(state: &MockPlatformState, target: KeyTarget) -> Option<String> {
        match target {
            KeyTarget::Pseudo(pseudo) => Some(pseudo.name().to_string()),
            KeyTarget::Key(KeyCode(code)) => {
                state.keys.get(usize::try_from(code).ok()?).cloned()
            }
        }
    }
}

/// Clonable observer handle for `MockPlatform`.
#[derive(Clone)]
pub struct MockPlatformHandle {
    state: Arc<Mutex<MockPlatformState>>,
}

impl MockPlatformHandle {
    /// Get a snapshot of all recorded injections.
    pub fn injected(&self) -> Vec<Injected> {
        self.state.lock().unwrap().injected.clone()
    }

    /// Forget recorded injections.
    pub fn clear(&self) {
        self.state.lock().unwrap().injected.clear();
    }

    /// Make every subsequent injection fail (after being recorded).
    pub fn set_fail_injection(&self, fail: bool) {
        self.state.lock().unwrap().fail_injection = fail;
    }

    /// Register a window image. An empty `target` replaces the display image.
    pub fn set_image(&self, target: &str, jpeg: Vec<u8>) {
        self.state.lock().unwrap().images.insert(target.to_string(), jpeg);
    }

    /// Check if shutdown was called.
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().unwrap().shutdown
    }
}

impl Platform for MockPlatform {
    fn translate_key_name(&self, name: &str) -> Result<KeyCode, InputError> {
        let canonical = self.canonical_key_name(name);
        let state = self.state.lock().unwrap();
        state
            .keys
            .iter()
            .position(|k| *k == canonical)
            .and_then(|i| u32::try_from(i).ok())
            .map(KeyCode)
            .ok_or_else(|| InputError::UnknownKey(name.to_string()))
    }

    fn canonical_key_name(&self, name: &str) -> String {
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or(name, |(_, canonical)| *canonical)
            .to_string()
    }

    fn inject_key(&self, target: KeyTarget, down: bool) -> Result<(), InputError> {
        let mut state = self.state.lock().unwrap();
        state.injected.push(Injected::Key { target, down });
        if state.fail_injection {
            return Err(InputError::Inject("mock injection failure".to_string()));
        }
        if let (Some(echo), Some(name)) = (&state.echo, Self::key_name(&state, target)) {
            match target {
                // A notch is reported as a press and release; no release event.
                KeyTarget::Pseudo(PseudoKey::Wheel(_)) if down => {
                    let _ = echo.try_send(RawEvent::key_down(name.clone()));
                    let _ = echo.try_send(RawEvent::key_up(name));
                }
                KeyTarget::Pseudo(PseudoKey::Wheel(_)) => {}
                _ => {
                    let _ = echo.try_send(RawEvent::Key { name, down });
                }
            }
        }
        Ok(())
    }

    fn inject_motion(&self, dx: i32, dy: i32) -> Result<(), InputError> {
        let mut state = self.state.lock().unwrap();
        state.injected.push(Injected::Motion { dx, dy });
        if state.fail_injection {
            return Err(InputError::Inject("mock injection failure".to_string()));
        }
        if let Some(echo) = &state.echo {
            let _ = echo.try_send(RawEvent::motion(dx, dy));
        }
        Ok(())
    }

    fn capture_image(&self, target: &str, _quality: u8) -> Result<Vec<u8>, InputError> {
        self.state
            .lock()
            .unwrap()
            .images
            .get(target)
            .cloned()
            .ok_or_else(|| InputError::TargetNotFound(target.to_string()))
    }

    fn shutdown(&self) -> Result<(), InputError> {
        self.state.lock().unwrap().shutdown = true;
        Ok(())
    }
}
