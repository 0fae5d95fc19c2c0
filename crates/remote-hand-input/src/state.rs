//! Shared input bookkeeping.
//!
//! [`InputState`] owns every collection the capture side and the injection
//! side share, behind one mutex. Each public method takes the lock once, so
//! any operation touching several collections is atomic. Nothing here calls
//! into the platform; callers that need to inject while reacting to state
//! (force-release) take a snapshot, drop the lock, then act.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outcome of feeding a raw key edge to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyVerdict {
    /// The edge was the echo of an injected event and has been consumed.
    Echo,
    /// A genuine key release was recorded.
    GenuineUp,
    /// A genuine key press was recorded. The user has taken over, so held
    /// synthetic keys must be released.
    GenuineDown,
}

/// Outcome of feeding a raw motion to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionVerdict {
    Echo,
    Genuine,
}

/// Counted set of key names.
#[derive(Debug, Default)]
struct Multiset {
    counts: HashMap<String, usize>,
}

impl Multiset {
    fn insert(&mut self, name: &str) {
        *self.counts.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Remove one occurrence. Returns `false` if there was none.
    fn take_one(&mut self, name: &str) -> bool {
        match self.counts.get_mut(name) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.counts.remove(name);
                true
            }
            None => false,
        }
    }

    fn count(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct Tracked {
    /// Genuine keys pressed since the last poll that also saw their release.
    pressed: BTreeSet<String>,
    /// Genuine releases since the last poll.
    released: BTreeSet<String>,
    /// Genuine motion since the last poll.
    mouse_delta: (i32, i32),
    expected_downs: Multiset,
    expected_ups: Multiset,
    /// Front is the most recent injection.
    expected_motion: VecDeque<(i32, i32)>,
    /// Keys held down by injection and not yet released.
    fake_pressed: BTreeSet<String>,
}

impl Tracked {
    fn user_active(&self) -> bool {
        self.pressed.iter().any(|k| !self.released.contains(k))
    }
}

/// Process-wide input state shared by capture and injection.
#[derive(Debug, Default)]
pub struct InputState {
    inner: Mutex<Tracked>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tracked> {
        // Every mutation leaves the collections consistent, so a panic on
        // another thread does not invalidate them.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Classify a raw key edge and record it if genuine.
    pub fn record_key(&self, name: &str, down: bool) -> KeyVerdict {
        let mut state = self.lock();
        if down {
            if state.expected_downs.take_one(name) {
                return KeyVerdict::Echo;
            }
            state.pressed.insert(name.to_string());
            state.released.remove(name);
            KeyVerdict::GenuineDown
        } else {
            if state.expected_ups.take_one(name) {
                return KeyVerdict::Echo;
            }
            state.released.insert(name.to_string());
            KeyVerdict::GenuineUp
        }
    }

    /// Classify a raw motion and accumulate it if genuine.
    ///
    /// Only the most recent pending injection can match.
    pub fn record_motion(&self, dx: i32, dy: i32) -> MotionVerdict {
        let mut state = self.lock();
        if state.expected_motion.front() == Some(&(dx, dy)) {
            state.expected_motion.pop_front();
            return MotionVerdict::Echo;
        }
        let (x, y) = state.mouse_delta;
        state.mouse_delta = (x.saturating_add(dx), y.saturating_add(dy));
        MotionVerdict::Genuine
    }

    /// Whether the human is currently holding a key or mouse button.
    pub fn is_user_active(&self) -> bool {
        self.lock().user_active()
    }

    /// Register the echo an injected key edge will produce.
    pub fn expect_key(&self, name: &str, down: bool) {
        let mut state = self.lock();
        if down {
            state.expected_downs.insert(name);
            state.fake_pressed.insert(name.to_string());
        } else {
            state.expected_ups.insert(name);
            state.fake_pressed.remove(name);
        }
    }

    /// Register the echo of one injected wheel notch: a press immediately
    /// followed by its release. Nothing stays held.
    pub fn expect_wheel_step(&self, name: &str) {
        let mut state = self.lock();
        state.expected_downs.insert(name);
        state.expected_ups.insert(name);
    }

    /// Register the echo an injected motion will produce.
    pub fn expect_motion(&self, dx: i32, dy: i32) {
        self.lock().expected_motion.push_front((dx, dy));
    }

    /// Snapshot of the keys currently held by injection.
    pub fn fake_keys(&self) -> Vec<String> {
        self.lock().fake_pressed.iter().cloned().collect()
    }

    pub fn clear_fake_keys(&self) {
        self.lock().fake_pressed.clear();
    }

    /// Return every key pressed since the last poll, then forget the ones
    /// whose release has also been seen.
    pub fn poll_pressed_keys(&self) -> BTreeSet<String> {
        let mut state = self.lock();
        let snapshot = state.pressed.clone();
        let released = std::mem::take(&mut state.released);
        state.pressed.retain(|k| !released.contains(k));
        snapshot
    }

    /// Return the genuine motion since the last poll and reset it.
    pub fn poll_mouse_delta(&self) -> (i32, i32) {
        std::mem::take(&mut self.lock().mouse_delta)
    }

    pub fn expected_key_downs(&self, name: &str) -> usize {
        self.lock().expected_downs.count(name)
    }

    pub fn expected_key_ups(&self, name: &str) -> usize {
        self.lock().expected_ups.count(name)
    }

    pub fn pending_motions(&self) -> usize {
        self.lock().expected_motion.len()
    }

    /// Genuine releases recorded since the last poll.
    pub fn pending_releases(&self) -> usize {
        self.lock().released.len()
    }
}
