//! evdev-based input capture for Linux.

use std::path::PathBuf;

use async_trait::async_trait;
use evdev::{
    Device, EventSummary, EventType, KeyCode as EvdevKey, RelativeAxisCode, SynchronizationCode,
};
use remote_hand_types::{PseudoKey, RawEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::keymap;
use crate::error::InputError;
use crate::InputCapture;

/// Linux input capture using evdev.
///
/// Reads events from every keyboard and mouse under `/dev/input/event*`
/// passively, without grabbing. The agent's own virtual device is one of
/// them, which is how injected events come back as echoes.
pub struct EvdevCapture {
    extra: Vec<PathBuf>,
    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<watch::Sender<bool>>,
}

impl Default for EvdevCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl EvdevCapture {
    pub fn new() -> Self {
        Self {
            extra: Vec::new(),
            task: None,
            shutdown_tx: None,
        }
    }

    /// Always watch `path`, even if enumeration misses it.
    ///
    /// Used for the virtual device node, which may not be visible to
    /// enumeration right after creation.
    #[must_use]
    pub fn with_device(mut self, path: impl Into<PathBuf>) -> Self {
        self.extra.push(path.into());
        self
    }

    /// Enumerate keyboards and mice.
    pub fn enumerate_devices() -> Vec<(PathBuf, String)> {
        evdev::enumerate()
            .filter(|(_, device)| is_keyboard_or_mouse(device))
            .map(|(path, device)| {
                let name = device.name().unwrap_or("Unknown Device").to_string();
                (path, name)
            })
            .collect()
    }
}

fn is_keyboard_or_mouse(device: &Device) -> bool {
    let supported = device.supported_events();
    let keys = supported.contains(EventType::KEY)
        && device.supported_keys().is_some_and(|keys| {
            (keys.contains(EvdevKey::KEY_A) && keys.contains(EvdevKey::KEY_ENTER))
                || keys.contains(EvdevKey::BTN_LEFT)
        });
    let motion = supported.contains(EventType::RELATIVE)
        && device.supported_relative_axes().is_some_and(|rel| {
            rel.contains(RelativeAxisCode::REL_X) || rel.contains(RelativeAxisCode::REL_WHEEL)
        });
    keys || motion
}

#[async_trait]
impl InputCapture for EvdevCapture {
    async fn start(&mut self, tx: mpsc::Sender<RawEvent>) -> Result<(), InputError> {
        let mut device_list = Self::enumerate_devices();
        for path in &self.extra {
            if !device_list.iter().any(|(p, _)| p == path) {
                device_list.push((path.clone(), "virtual device".to_string()));
            }
        }

        if device_list.is_empty() {
            return Err(InputError::DeviceOpen(
                "no keyboard or mouse devices found".to_string(),
            ));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        let mut handles = Vec::new();
        for (path, name) in device_list {
            info!(device = %name, path = %path.display(), "tracking device");
            let tx = tx.clone();
            let shutdown_rx = shutdown_rx.clone();
            handles.push(tokio::spawn(read_device(path, tx, shutdown_rx)));
        }

        // Supervisor that waits for all reader tasks
        self.task = Some(tokio::spawn(async move {
            for h in handles {
                let _ = h.await;
            }
        }));

        info!("input capture started");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), InputError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("input capture shut down");
        Ok(())
    }
}

async fn read_device(
    path: PathBuf,
    tx: mpsc::Sender<RawEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut stream = match Device::open(&path).and_then(Device::into_event_stream) {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open device");
            return;
        }
    };

    let mut decoder = EventDecoder::default();
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            result = stream.next_event() => {
                let ev = match result {
                    Ok(ev) => ev,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "device read error");
                        break;
                    }
                };
                for raw in decoder.feed(&ev) {
                    trace!(?raw, "captured");
                    if tx.send(raw).await.is_err() {
                        debug!(path = %path.display(), "capture receiver dropped");
                        return;
                    }
                }
            }
        }
    }
}

/// Per-device translation of evdev events into raw events.
///
/// Relative X/Y are summed until `SYN_REPORT` so that one injected motion
/// is observed as one motion. Key autorepeat is dropped.
#[derive(Debug, Default)]
struct EventDecoder {
    delta: (i32, i32),
}

impl EventDecoder {
    fn feed(&mut self, ev: &evdev::InputEvent) -> Vec<RawEvent> {
        match ev.destructure() {
            EventSummary::Key(_, key, value) => {
                let down = match value {
                    0 => false,
                    1 => true,
                    _ => return Vec::new(),
                };
                match keymap::captured_key_name(key) {
                    Some(name) => vec![RawEvent::Key {
                        name: name.to_string(),
                        down,
                    }],
                    None => {
                        trace!(code = key.code(), "ignoring unmapped key");
                        Vec::new()
                    }
                }
            }
            EventSummary::RelativeAxis(_, RelativeAxisCode::REL_X, value) => {
                self.delta.0 = self.delta.0.saturating_add(value);
                Vec::new()
            }
            EventSummary::RelativeAxis(_, RelativeAxisCode::REL_Y, value) => {
                self.delta.1 = self.delta.1.saturating_add(value);
                Vec::new()
            }
            EventSummary::RelativeAxis(_, axis, value) => {
                // Each notch is a press and release of the wheel pseudo-key.
                let Some(direction) = keymap::wheel_direction(axis, value) else {
                    return Vec::new();
                };
                let name = PseudoKey::Wheel(direction).name();
                (0..value.unsigned_abs())
                    .flat_map(|_| [RawEvent::key_down(name), RawEvent::key_up(name)])
                    .collect()
            }
            EventSummary::Synchronization(_, SynchronizationCode::SYN_REPORT, _) => {
                match std::mem::take(&mut self.delta) {
                    (0, 0) => Vec::new(),
                    (dx, dy) => vec![RawEvent::motion(dx, dy)],
                }
            }
            _ => Vec::new(),
        }
    }
}
