//! Key names understood by the Linux backend and their evdev codes.
//!
//! The vocabulary follows the X11 agent: lowercase, space separated
//! (`"page up"`, `"numpad 7"`, `"square bracket open"`).

use evdev::{KeyCode as EvdevKey, RelativeAxisCode};
use remote_hand_types::{MouseButton, PseudoKey, WheelDirection};

use crate::KeyCode;

/// Canonical key names. The capture side reports exactly these names.
const KEYS: &[(&str, EvdevKey)] = &[
    ("backspace", EvdevKey::KEY_BACKSPACE),
    ("tab", EvdevKey::KEY_TAB),
    ("clear", EvdevKey::KEY_CLEAR),
    ("enter", EvdevKey::KEY_ENTER),
    ("pause", EvdevKey::KEY_PAUSE),
    ("caps lock", EvdevKey::KEY_CAPSLOCK),
    ("esc", EvdevKey::KEY_ESC),
    ("space", EvdevKey::KEY_SPACE),
    ("page up", EvdevKey::KEY_PAGEUP),
    ("page down", EvdevKey::KEY_PAGEDOWN),
    ("end", EvdevKey::KEY_END),
    ("home", EvdevKey::KEY_HOME),
    ("left", EvdevKey::KEY_LEFT),
    ("up", EvdevKey::KEY_UP),
    ("right", EvdevKey::KEY_RIGHT),
    ("down", EvdevKey::KEY_DOWN),
    ("select", EvdevKey::KEY_SELECT),
    ("print", EvdevKey::KEY_PRINT),
    ("insert", EvdevKey::KEY_INSERT),
    ("delete", EvdevKey::KEY_DELETE),
    ("help", EvdevKey::KEY_HELP),
    ("0", EvdevKey::KEY_0),
    ("1", EvdevKey::KEY_1),
    ("2", EvdevKey::KEY_2),
    ("3", EvdevKey::KEY_3),
    ("4", EvdevKey::KEY_4),
    ("5", EvdevKey::KEY_5),
    ("6", EvdevKey::KEY_6),
    ("7", EvdevKey::KEY_7),
    ("8", EvdevKey::KEY_8),
    ("9", EvdevKey::KEY_9),
    ("a", EvdevKey::KEY_A),
    ("b", EvdevKey::KEY_B),
    ("c", EvdevKey::KEY_C),
    ("d", EvdevKey::KEY_D),
    ("e", EvdevKey::KEY_E),
    ("f", EvdevKey::KEY_F),
    ("g", EvdevKey::KEY_G),
    ("h", EvdevKey::KEY_H),
    ("i", EvdevKey::KEY_I),
    ("j", EvdevKey::KEY_J),
    ("k", EvdevKey::KEY_K),
    ("l", EvdevKey::KEY_L),
    ("m", EvdevKey::KEY_M),
    ("n", EvdevKey::KEY_N),
    ("o", EvdevKey::KEY_O),
    ("p", EvdevKey::KEY_P),
    ("q", EvdevKey::KEY_Q),
    ("r", EvdevKey::KEY_R),
    ("s", EvdevKey::KEY_S),
    ("t", EvdevKey::KEY_T),
    ("u", EvdevKey::KEY_U),
    ("v", EvdevKey::KEY_V),
    ("w", EvdevKey::KEY_W),
    ("x", EvdevKey::KEY_X),
    ("y", EvdevKey::KEY_Y),
    ("z", EvdevKey::KEY_Z),
    ("left windows", EvdevKey::KEY_LEFTMETA),
    ("right windows", EvdevKey::KEY_RIGHTMETA),
    ("numpad 0", EvdevKey::KEY_KP0),
    ("numpad 1", EvdevKey::KEY_KP1),
    ("numpad 2", EvdevKey::KEY_KP2),
    ("numpad 3", EvdevKey::KEY_KP3),
    ("numpad 4", EvdevKey::KEY_KP4),
    ("numpad 5", EvdevKey::KEY_KP5),
    ("numpad 6", EvdevKey::KEY_KP6),
    ("numpad 7", EvdevKey::KEY_KP7),
    ("numpad 8", EvdevKey::KEY_KP8),
    ("numpad 9", EvdevKey::KEY_KP9),
    ("multiply", EvdevKey::KEY_KPASTERISK),
    ("add", EvdevKey::KEY_KPPLUS),
    ("separator", EvdevKey::KEY_KPCOMMA),
    ("subtract", EvdevKey::KEY_KPMINUS),
    ("decimal", EvdevKey::KEY_KPDOT),
    ("divide", EvdevKey::KEY_KPSLASH),
    ("f1", EvdevKey::KEY_F1),
    ("f2", EvdevKey::KEY_F2),
    ("f3", EvdevKey::KEY_F3),
    ("f4", EvdevKey::KEY_F4),
    ("f5", EvdevKey::KEY_F5),
    ("f6", EvdevKey::KEY_F6),
    ("f7", EvdevKey::KEY_F7),
    ("f8", EvdevKey::KEY_F8),
    ("f9", EvdevKey::KEY_F9),
    ("f10", EvdevKey::KEY_F10),
    ("f11", EvdevKey::KEY_F11),
    ("f12", EvdevKey::KEY_F12),
    ("num lock", EvdevKey::KEY_NUMLOCK),
    ("scroll lock", EvdevKey::KEY_SCROLLLOCK),
    ("left shift", EvdevKey::KEY_LEFTSHIFT),
    ("right shift", EvdevKey::KEY_RIGHTSHIFT),
    ("left ctrl", EvdevKey::KEY_LEFTCTRL),
    ("right ctrl", EvdevKey::KEY_RIGHTCTRL),
    ("left alt", EvdevKey::KEY_LEFTALT),
    ("right alt", EvdevKey::KEY_RIGHTALT),
    ("plus", EvdevKey::KEY_EQUAL),
    ("comma", EvdevKey::KEY_COMMA),
    ("minus", EvdevKey::KEY_MINUS),
    ("period", EvdevKey::KEY_DOT),
    ("semicolon", EvdevKey::KEY_SEMICOLON),
    ("slash", EvdevKey::KEY_SLASH),
    ("backtick", EvdevKey::KEY_GRAVE),
    ("square bracket open", EvdevKey::KEY_LEFTBRACE),
    ("square bracket close", EvdevKey::KEY_RIGHTBRACE),
    ("backslash", EvdevKey::KEY_BACKSLASH),
    ("quote", EvdevKey::KEY_APOSTROPHE),
    ("angle bracket", EvdevKey::KEY_102ND),
    ("print screen", EvdevKey::KEY_SYSRQ),
    ("applications", EvdevKey::KEY_COMPOSE),
];

/// Generic names accepted for injection. evdev only reports the sided key.
const ALIASES: &[(&str, &str)] = &[
    ("shift", "left shift"),
    ("ctrl", "left ctrl"),
    ("alt", "left alt"),
];

/// Resolve aliases to the name the capture side reports.
pub fn canonical_name(name: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, canonical)| *canonical)
}

/// Look up an ordinary key name, aliases included.
pub fn name_to_evdev_key(name: &str) -> Option<EvdevKey> {
    let name = canonical_name(name);
    KEYS.iter().find(|(n, _)| *n == name).map(|(_, key)| *key)
}

/// Reverse lookup for captured key events.
pub fn evdev_key_to_name(key: EvdevKey) -> Option<&'static str> {
    KEYS.iter().find(|(_, k)| *k == key).map(|(name, _)| *name)
}

pub fn keycode_to_evdev_key(code: KeyCode) -> Option<EvdevKey> {
    u16::try_from(code.0).ok().map(EvdevKey)
}

pub fn evdev_key_to_keycode(key: EvdevKey) -> KeyCode {
    KeyCode(u32::from(key.code()))
}

pub fn mouse_button_to_evdev_key(button: MouseButton) -> EvdevKey {
    match button {
        MouseButton::Left => EvdevKey::BTN_LEFT,
        MouseButton::Right => EvdevKey::BTN_RIGHT,
        MouseButton::Middle => EvdevKey::BTN_MIDDLE,
    }
}

pub fn evdev_key_to_mouse_button(key: EvdevKey) -> Option<MouseButton> {
    match key {
        EvdevKey::BTN_LEFT => Some(MouseButton::Left),
        EvdevKey::BTN_RIGHT => Some(MouseButton::Right),
        EvdevKey::BTN_MIDDLE => Some(MouseButton::Middle),
        _ => None,
    }
}

/// `REL_WHEEL` value for one wheel step.
pub fn wheel_step(direction: WheelDirection) -> i32 {
    match direction {
        WheelDirection::Up => 1,
        WheelDirection::Down => -1,
    }
}

/// Wheel direction of a `REL_WHEEL` report, if any.
pub fn wheel_direction(axis: RelativeAxisCode, value: i32) -> Option<WheelDirection> {
    if axis != RelativeAxisCode::REL_WHEEL {
        return None;
    }
    match value.signum() {
        1 => Some(WheelDirection::Up),
        -1 => Some(WheelDirection::Down),
        _ => None,
    }
}

/// Name reported for a captured key or button code.
pub fn captured_key_name(key: EvdevKey) -> Option<&'static str> {
    evdev_key_to_mouse_button(key)
        .map(|b| PseudoKey::Button(b).name())
        .or_else(|| evdev_key_to_name(key))
}

/// Every ordinary key code the virtual device has to declare.
pub fn all_keys() -> impl Iterator<Item = EvdevKey> {
    KEYS.iter().map(|(_, key)| *key)
}
