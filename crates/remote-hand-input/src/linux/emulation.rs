//! uinput-based injection for Linux.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use evdev::uinput::VirtualDevice;
use evdev::{AttributeSet, EventType, KeyCode as EvdevKey, RelativeAxisCode};
use remote_hand_types::PseudoKey;
use tracing::{debug, info, warn};

use super::keymap;
use crate::error::InputError;
use crate::{KeyCode, KeyTarget, Platform};

const DEVICE_NAME: &str = "remote-hand virtual input";

/// Linux platform backed by one uinput virtual device.
///
/// The device declares every key in the key table, the three mouse buttons,
/// relative X/Y and the vertical wheel. Its events reach the rest of the
/// system like any other input device, so an [`EvdevCapture`] watching it
/// sees every injection as an echo.
///
/// [`EvdevCapture`]: super::EvdevCapture
pub struct UinputPlatform {
    device: Mutex<Option<VirtualDevice>>,
    node: Option<PathBuf>,
}

impl UinputPlatform {
    /// Create the virtual device. Needs write access to `/dev/uinput`.
    pub fn new() -> Result<Self, InputError> {
        let mut device = Self::build_virtual_device()?;
        let node = match device.enumerate_dev_nodes_blocking() {
            Ok(mut nodes) => nodes.find_map(Result::ok),
            Err(e) => {
                warn!(error = %e, "failed to locate virtual device node");
                None
            }
        };
        info!(name = DEVICE_NAME, node = ?node, "created virtual device");
        Ok(Self {
            device: Mutex::new(Some(device)),
            node,
        })
    }

    /// `/dev/input/event*` node of the virtual device, if it could be found.
    pub fn device_node(&self) -> Option<&PathBuf> {
        self.node.as_ref()
    }

    fn build_virtual_device() -> Result<VirtualDevice, InputError> {
        let create_err = |e: std::io::Error| InputError::VirtualDeviceCreate(e.to_string());

        let mut keys = AttributeSet::<EvdevKey>::new();
        for key in keymap::all_keys() {
            keys.insert(key);
        }
        keys.insert(EvdevKey::BTN_LEFT);
        keys.insert(EvdevKey::BTN_RIGHT);
        keys.insert(EvdevKey::BTN_MIDDLE);

        let mut rel = AttributeSet::<RelativeAxisCode>::new();
        rel.insert(RelativeAxisCode::REL_X);
        rel.insert(RelativeAxisCode::REL_Y);
        rel.insert(RelativeAxisCode::REL_WHEEL);

        VirtualDevice::builder()
            .map_err(create_err)?
            .name(DEVICE_NAME)
            .with_keys(&keys)
            .map_err(create_err)?
            .with_relative_axes(&rel)
            .map_err(create_err)?
            .build()
            .map_err(create_err)
    }

    fn lock(&self) -> MutexGuard<'_, Option<VirtualDevice>> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, events: &[evdev::InputEvent]) -> Result<(), InputError> {
        if events.is_empty() {
            return Ok(());
        }
        let mut guard = self.lock();
        let device = guard
            .as_mut()
            .ok_or_else(|| InputError::Inject("virtual device is shut down".to_string()))?;
        device
            .emit(events)
            .map_err(|e| InputError::Inject(e.to_string()))
    }
}

impl Platform for UinputPlatform {
    fn translate_key_name(&self, name: &str) -> Result<KeyCode, InputError> {
        keymap::name_to_evdev_key(name)
            .map(keymap::evdev_key_to_keycode)
            .ok_or_else(|| InputError::UnknownKey(name.to_string()))
    }

    fn canonical_key_name(&self, name: &str) -> String {
        keymap::canonical_name(name).to_string()
    }

    fn inject_key(&self, target: KeyTarget, down: bool) -> Result<(), InputError> {
        let events = key_target_to_evdev(target, down)?;
        self.emit(&events)?;
        debug!(?target, down, "injected key");
        Ok(())
    }

    fn inject_motion(&self, dx: i32, dy: i32) -> Result<(), InputError> {
        self.emit(&motion_to_evdev(dx, dy))
    }

    fn capture_image(&self, _target: &str, _quality: u8) -> Result<Vec<u8>, InputError> {
        Err(InputError::Unavailable)
    }

    fn shutdown(&self) -> Result<(), InputError> {
        if self.lock().take().is_some() {
            info!("destroyed virtual device");
        }
        Ok(())
    }
}

/// Events for one key edge.
///
/// A wheel step has no release: the press emits one `REL_WHEEL` notch and
/// the release emits nothing.
fn key_target_to_evdev(target: KeyTarget, down: bool) -> Result<Vec<evdev::InputEvent>, InputError> {
    let value = i32::from(down);
    let key = match target {
        KeyTarget::Key(code) => keymap::keycode_to_evdev_key(code)
            .ok_or_else(|| InputError::Inject(format!("key code {} out of range", code.0)))?,
        KeyTarget::Pseudo(PseudoKey::Button(button)) => keymap::mouse_button_to_evdev_key(button),
        KeyTarget::Pseudo(PseudoKey::Wheel(direction)) => {
            if !down {
                return Ok(Vec::new());
            }
            return Ok(vec![evdev::InputEvent::new(
                EventType::RELATIVE.0,
                RelativeAxisCode::REL_WHEEL.0,
                keymap::wheel_step(direction),
            )]);
        }
    };
    Ok(vec![evdev::InputEvent::new(EventType::KEY.0, key.0, value)])
}

/// Zero axes are left out; the kernel drops them anyway.
fn motion_to_evdev(dx: i32, dy: i32) -> Vec<evdev::InputEvent> {
    [(RelativeAxisCode::REL_X, dx), (RelativeAxisCode::REL_Y, dy)]
        .into_iter()
        .filter(|(_, value)| *value != 0)
        .map(|(axis, value)| evdev::InputEvent::new(EventType::RELATIVE.0, axis.0, value))
        .collect()
}
