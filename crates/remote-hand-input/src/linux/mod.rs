//! evdev/uinput backend.

mod capture;
mod emulation;
pub mod keymap;

pub use capture::EvdevCapture;
pub use emulation::UinputPlatform;
