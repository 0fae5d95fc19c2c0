//! Raw input events reported by a capture backend.
//!
//! These are what the operating system says happened, before the agent has
//! decided whether an event is its own echo or genuine human input.

/// A raw key/button edge or a relative motion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// Key or pseudo-key edge. `name` uses the same vocabulary as requests.
    Key { name: String, down: bool },

    /// Relative pointer motion, one report per OS motion event.
    Motion { dx: i32, dy: i32 },
}

impl RawEvent {
    pub fn key_down(name: impl Into<String>) -> Self {
        Self::Key {
            name: name.into(),
            down: true,
        }
    }

    pub fn key_up(name: impl Into<String>) -> Self {
        Self::Key {
            name: name.into(),
            down: false,
        }
    }

    pub fn motion(dx: i32, dy: i32) -> Self {
        Self::Motion { dx, dy }
    }
}
