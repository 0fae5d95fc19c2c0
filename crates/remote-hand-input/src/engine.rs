//! Injection, echo suppression and polling over a [`Platform`].

use std::collections::BTreeSet;
use std::sync::Arc;

use remote_hand_types::{PseudoKey, RawEvent};
use tracing::{debug, trace, warn};

use crate::error::InputError;
use crate::state::{InputState, KeyVerdict, MotionVerdict};
use crate::{KeyTarget, Platform};

/// The input engine shared by the request loop and the capture task.
///
/// Cloning is cheap; clones share the same state and platform.
#[derive(Clone)]
pub struct InputEngine {
    state: Arc<InputState>,
    platform: Arc<dyn Platform>,
}

impl InputEngine {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            state: Arc::new(InputState::new()),
            platform,
        }
    }

    /// The shared bookkeeping, for inspection.
    pub fn state(&self) -> &InputState {
        &self.state
    }

    /// Feed one raw event from the capture side.
    pub fn observe(&self, event: &RawEvent) {
        match event {
            RawEvent::Key { name, down } => self.observe_key_event(name, *down),
            RawEvent::Motion { dx, dy } => self.observe_motion(*dx, *dy),
        }
    }

    /// Classify a raw key edge.
    ///
    /// A genuine press means the user has taken over: every key still held by
    /// injection is released.
    pub fn observe_key_event(&self, name: &str, down: bool) {
        match self.state.record_key(name, down) {
            KeyVerdict::Echo => trace!(key = name, down, "suppressed echo"),
            KeyVerdict::GenuineUp => trace!(key = name, "genuine release"),
            KeyVerdict::GenuineDown => {
                trace!(key = name, "genuine press");
                let released = self.release_all_synthetic();
                if released > 0 {
                    debug!(key = name, released, "user took over, released synthetic keys");
                }
            }
        }
    }

    /// Classify a raw motion.
    pub fn observe_motion(&self, dx: i32, dy: i32) {
        match self.state.record_motion(dx, dy) {
            MotionVerdict::Echo => trace!(dx, dy, "suppressed motion echo"),
            MotionVerdict::Genuine => trace!(dx, dy, "genuine motion"),
        }
    }

    pub fn is_user_active(&self) -> bool {
        self.state.is_user_active()
    }

    /// Press or release a key or pseudo-key.
    ///
    /// With `user_override` set, nothing happens while the user is holding a
    /// key or button. An unknown name fails without touching the state. Once
    /// the name resolves, the echo is registered whether or not the platform
    /// call succeeds, so expectations always match attempted injections.
    ///
    /// The expectation is registered before the platform call: the echo can
    /// reach the capture task before the call returns.
    pub fn inject_key(
        &self,
        name: &str,
        down: bool,
        user_override: bool,
    ) -> Result<(), InputError> {
        if user_override && self.state.is_user_active() {
            return Err(InputError::UserActive);
        }

        let (target, name) = self.resolve(name)?;
        if let KeyTarget::Pseudo(PseudoKey::Wheel(_)) = target {
            return self.inject_wheel_step(target, &name, down);
        }
        self.state.expect_key(&name, down);
        let result = self.platform.inject_key(target, down);
        trace!(key = %name, down, ok = result.is_ok(), "injected key");
        result
    }

    /// A wheel press is one notch, reported back as a press and a release.
    /// The wheel cannot be held, so its release does nothing.
    fn inject_wheel_step(
        &self,
        target: KeyTarget,
        name: &str,
        down: bool,
    ) -> Result<(), InputError> {
        if !down {
            trace!(key = name, "wheel has no release, skipped");
            return Ok(());
        }
        self.state.expect_wheel_step(name);
        let result = self.platform.inject_key(target, true);
        trace!(key = name, ok = result.is_ok(), "injected wheel step");
        result
    }

    /// Move the pointer and register the expected echo.
    pub fn inject_motion(&self, dx: i32, dy: i32) -> Result<(), InputError> {
        self.state.expect_motion(dx, dy);
        let result = self.platform.inject_motion(dx, dy);
        trace!(dx, dy, ok = result.is_ok(), "injected motion");
        result
    }

    /// Release every key currently held by injection.
    ///
    /// Works on a snapshot so no lock is held across platform calls. Returns
    /// the number of keys released.
    pub fn release_all_synthetic(&self) -> usize {
        let held = self.state.fake_keys();
        for key in &held {
            if let Err(e) = self.inject_key(key, false, false) {
                warn!(key = %key, error = %e, "failed to release synthetic key");
            }
        }
        self.state.clear_fake_keys();
        held.len()
    }

    /// Genuine keys pressed since the previous poll.
    pub fn poll_pressed_keys(&self) -> BTreeSet<String> {
        self.state.poll_pressed_keys()
    }

    /// Genuine mouse movement since the previous poll.
    pub fn poll_mouse_delta(&self) -> (i32, i32) {
        self.state.poll_mouse_delta()
    }

    /// Capture a JPEG through the platform.
    pub fn capture_image(&self, target: &str, quality: u8) -> Result<Vec<u8>, InputError> {
        self.platform.capture_image(target, quality)
    }

    /// Optionally release synthetic holds, then shut the platform down.
    pub fn shutdown(&self, release_held: bool) -> Result<(), InputError> {
        if release_held {
            let released = self.release_all_synthetic();
            if released > 0 {
                debug!(released, "released synthetic keys on shutdown");
            }
        }
        self.platform.shutdown()
    }

    fn resolve(&self, name: &str) -> Result<(KeyTarget, String), InputError> {
        if let Some(pseudo) = PseudoKey::from_name(name) {
            return Ok((KeyTarget::Pseudo(pseudo), name.to_string()));
        }
        let code = self.platform.translate_key_name(name)?;
        Ok((KeyTarget::Key(code), self.platform.canonical_key_name(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Injected, MockPlatform, MockPlatformHandle};
    use remote_hand_types::MouseButton;

    fn engine() -> (InputEngine, MockPlatformHandle) {
        let platform = MockPlatform::new();
        let handle = platform.handle();
        (InputEngine::new(Arc::new(platform)), handle)
    }

    fn released_keys(injected: &[Injected]) -> Vec<KeyTarget> {
        injected
            .iter()
            .filter_map(|i| match i {
                Injected::Key { target, down: false } => Some(*target),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn injected_press_and_echo_leave_pressed_keys_unchanged() {
        let (engine, _) = engine();
        let before = engine.state().expected_key_downs("a");

        engine.inject_key("a", true, false).unwrap();
        engine.observe_key_event("a", true);

        assert_eq!(engine.state().expected_key_downs("a"), before);
        assert!(engine.poll_pressed_keys().is_empty());
    }

    #[test]
    fn repeated_presses_count_up_and_echoes_count_down() {
        let (engine, _) = engine();
        for _ in 0..4 {
            engine.inject_key("x", true, false).unwrap();
        }
        assert_eq!(engine.state().expected_key_downs("x"), 4);

        for remaining in (0..4).rev() {
            engine.observe_key_event("x", true);
            assert_eq!(engine.state().expected_key_downs("x"), remaining);
        }
    }

    #[test]
    fn genuine_press_releases_every_synthetic_hold() {
        let (engine, handle) = engine();
        engine.inject_key("a", true, false).unwrap();
        engine.inject_key("mouse left", true, false).unwrap();
        engine.observe_key_event("a", true);
        engine.observe_key_event("mouse left", true);
        handle.clear();

        engine.observe_key_event("q", true);

        assert!(engine.state().fake_keys().is_empty());
        let released = released_keys(&handle.injected());
        assert_eq!(released.len(), 2);
        assert!(released.contains(&KeyTarget::Pseudo(PseudoKey::Button(MouseButton::Left))));
        assert_eq!(engine.state().expected_key_ups("a"), 1);
        assert_eq!(engine.state().expected_key_ups("mouse left"), 1);
        // The user's own press is reported.
        assert!(engine.poll_pressed_keys().contains("q"));
    }

    #[test]
    fn echo_does_not_trigger_force_release() {
        let (engine, handle) = engine();
        engine.inject_key("a", true, false).unwrap();
        handle.clear();

        engine.observe_key_event("a", true);

        assert!(handle.injected().is_empty());
        assert_eq!(engine.state().fake_keys(), vec!["a".to_string()]);
    }

    #[test]
    fn unknown_key_fails_without_registration() {
        let (engine, handle) = engine();
        let err = engine.inject_key("no such key", true, false).unwrap_err();
        assert!(matches!(err, InputError::UnknownKey(_)));
        assert_eq!(engine.state().expected_key_downs("no such key"), 0);
        assert!(engine.state().fake_keys().is_empty());
        assert!(handle.injected().is_empty());
    }

    #[test]
    fn failed_platform_call_still_registers_echo() {
        let (engine, handle) = engine();
        handle.set_fail_injection(true);

        assert!(engine.inject_key("b", true, false).is_err());
        assert_eq!(engine.state().expected_key_downs("b"), 1);
        assert_eq!(engine.state().fake_keys(), vec!["b".to_string()]);

        assert!(engine.inject_motion(2, 2).is_err());
        assert_eq!(engine.state().pending_motions(), 1);
    }

    #[test]
    fn user_override_skips_injection_while_user_holds_a_key() {
        let (engine, handle) = engine();
        engine.observe_key_event("left ctrl", true);

        let err = engine.inject_key("c", true, true).unwrap_err();
        assert!(matches!(err, InputError::UserActive));
        assert!(handle.injected().is_empty());
        assert_eq!(engine.state().expected_key_downs("c"), 0);

        // Without the override flag the injection goes through.
        engine.inject_key("c", true, false).unwrap();
        assert_eq!(handle.injected().len(), 1);

        // Once released, the override no longer blocks.
        engine.observe_key_event("left ctrl", false);
        engine.inject_key("d", true, true).unwrap();
    }

    #[test]
    fn motion_echo_is_order_sensitive() {
        let (engine, _) = engine();
        engine.inject_motion(5, 0).unwrap();
        engine.inject_motion(3, 0).unwrap();

        engine.observe_motion(5, 0);
        engine.observe_motion(3, 0);

        assert_eq!(engine.poll_mouse_delta(), (5, 0));
        assert_eq!(engine.state().pending_motions(), 1);
    }

    #[test]
    fn echoed_press_then_genuine_release_reports_nothing() {
        let (engine, _) = engine();
        engine.inject_key("a", true, false).unwrap();
        engine.observe(&RawEvent::key_down("a"));
        engine.observe(&RawEvent::key_up("a"));

        assert!(engine.poll_pressed_keys().is_empty());
    }

    #[test]
    fn wheel_press_and_release_in_separate_requests_leave_no_residue() {
        let (engine, handle) = engine();

        // Press, then the notch comes back as a press and a release.
        engine.inject_key("mouse up", true, false).unwrap();
        engine.observe_key_event("mouse up", true);
        engine.observe_key_event("mouse up", false);
        // The release arrives in a later request.
        engine.inject_key("mouse up", false, false).unwrap();

        assert_eq!(engine.state().expected_key_downs("mouse up"), 0);
        assert_eq!(engine.state().expected_key_ups("mouse up"), 0);
        assert!(engine.state().fake_keys().is_empty());
        assert_eq!(handle.injected().len(), 1);
        assert!(engine.poll_pressed_keys().is_empty());

        // A genuine scroll is reported once and does not stick.
        engine.observe_key_event("mouse up", true);
        engine.observe_key_event("mouse up", false);
        assert!(!engine.is_user_active());
        assert!(engine.poll_pressed_keys().contains("mouse up"));
        assert!(engine.poll_pressed_keys().is_empty());
        engine.inject_key("a", true, true).unwrap();
    }

    #[test]
    fn wheel_step_is_never_held_for_release() {
        let (engine, handle) = engine();
        engine.inject_key("mouse down", true, false).unwrap();
        handle.clear();

        assert_eq!(engine.release_all_synthetic(), 0);
        assert!(handle.injected().is_empty());
    }

    #[test]
    fn aliases_register_under_canonical_name() {
        let (engine, _) = engine();
        engine.inject_key("shift", true, false).unwrap();
        assert_eq!(engine.state().expected_key_downs("left shift"), 1);
        engine.observe_key_event("left shift", true);
        assert!(engine.poll_pressed_keys().is_empty());
    }

    #[test]
    fn capture_and_requests_on_separate_threads_stay_consistent() {
        const ROUNDS: i32 = 500;
        let (engine, handle) = engine();

        let request_delta = std::thread::scope(|scope| {
            let capture = engine.clone();
            scope.spawn(move || {
                for _ in 0..ROUNDS {
                    // Each genuine press force-releases whatever is held.
                    capture.observe_key_event("q", true);
                    capture.observe_motion(9, 9);
                    capture.observe_key_event("q", false);
                }
            });

            let requests = engine.clone();
            let worker = scope.spawn(move || {
                let mut delta = (0, 0);
                for round in 0..ROUNDS {
                    requests.inject_key("a", true, false).unwrap();
                    requests.inject_motion(1, 0).unwrap();
                    if round % 7 == 0 {
                        requests.release_all_synthetic();
                    }
                    requests.poll_pressed_keys();
                    let (dx, dy) = requests.poll_mouse_delta();
                    delta = (delta.0 + dx, delta.1 + dy);
                }
                delta
            });
            worker.join().unwrap()
        });

        let releases = released_keys(&handle.injected()).len();
        let state = engine.state();
        assert_eq!(state.expected_key_downs("a"), ROUNDS as usize);
        assert_eq!(state.expected_key_ups("a"), releases);
        assert_eq!(state.pending_motions(), ROUNDS as usize);
        assert!(state.fake_keys().len() <= 1);

        let (dx, dy) = engine.poll_mouse_delta();
        assert_eq!((request_delta.0 + dx, request_delta.1 + dy), (9 * ROUNDS, 9 * ROUNDS));
        assert!(!engine.is_user_active());
    }

    #[test]
    fn shutdown_releases_held_keys() {
        let (engine, handle) = engine();
        engine.inject_key("space", true, false).unwrap();
        handle.clear();

        engine.shutdown(true).unwrap();

        assert_eq!(released_keys(&handle.injected()).len(), 1);
        assert!(handle.is_shutdown());
    }
}
