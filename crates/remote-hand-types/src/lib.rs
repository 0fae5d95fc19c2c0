//! Shared types for remote-hand.
//!
//! This crate contains the types shared across the remote-hand workspace:
//! the request/response messages exchanged with the controlling client, the
//! key-name vocabulary (including mouse pseudo-keys), and the raw events a
//! capture backend reports.

pub mod event;
pub mod key;
pub mod message;

pub use event::RawEvent;
pub use key::{MouseButton, PseudoKey, WheelDirection};
pub use message::{MouseMotion, MousePosition, Request, Response, MAX_QUALITY};
