//! Polled gesture and key state.
//!
//! The platform layer delivers discrete gesture events (tap, long-press,
//! fling, scroll) and raw key transitions; game code polls. Between logic
//! ticks, gesture events coalesce into a bitwise-OR'd flag set rather than
//! a queue -- a fling arriving in the same tick as a scroll sets both bits.
//! The scheduler clears the flags exactly once per logic tick, after every
//! active element has had a chance to observe them.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::geometry::Vec2;

pub const SINGLE_TAP: u32 = 1;
pub const FLING: u32 = 4;
pub const SCROLL: u32 = 8;
pub const LONG_PRESS: u32 = 16;

#[derive(Debug, Clone, Default)]
struct GestureInner {
    state: u32,
    main: Vec2,
    secondary: Vec2,
    scroll_delta: Vec2,
    keys_down: HashSet<u16>,
}

/// Shared input state. One instance lives on the engine context; the
/// platform thread writes, the logic thread polls and clears.
#[derive(Default)]
pub struct GestureState {
    inner: Mutex<GestureInner>,
}

impl GestureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a gesture, OR-ing its flag into the pending set.
    /// `secondary` carries the second event position for two-event gestures
    /// (fling, scroll); pass the primary again for single-point gestures.
    pub fn set_state(&self, flag: u32, main: Vec2, secondary: Vec2) {
        let mut inner = self.inner.lock().unwrap();
        inner.state |= flag;
        inner.main = main;
        inner.secondary = secondary;
    }

    /// Records a scroll or fling with its distance/velocity deltas.
    pub fn set_scroll_state(&self, flag: u32, main: Vec2, secondary: Vec2, delta: Vec2) {
        let mut inner = self.inner.lock().unwrap();
        inner.state |= flag;
        inner.main = main;
        inner.secondary = secondary;
        inner.scroll_delta = delta;
    }

    /// True when any of the masked gesture bits is pending.
    pub fn is_state(&self, mask: u32) -> bool {
        self.inner.lock().unwrap().state & mask != 0
    }

    pub fn main_x(&self) -> f32 {
        self.inner.lock().unwrap().main.x
    }

    pub fn main_y(&self) -> f32 {
        self.inner.lock().unwrap().main.y
    }

    pub fn secondary_pos(&self) -> Vec2 {
        self.inner.lock().unwrap().secondary
    }

    pub fn scroll_delta_x(&self) -> f32 {
        self.inner.lock().unwrap().scroll_delta.x
    }

    pub fn scroll_delta_y(&self) -> f32 {
        self.inner.lock().unwrap().scroll_delta.y
    }

    pub fn key_down(&self, code: u16) {
        self.inner.lock().unwrap().keys_down.insert(code);
    }

    pub fn key_up(&self, code: u16) {
        self.inner.lock().unwrap().keys_down.remove(&code);
    }

    pub fn is_key_down(&self, code: u16) -> bool {
        self.inner.lock().unwrap().keys_down.contains(&code)
    }

    /// Clears the coalesced gesture flags. Key hold state persists; it is
    /// level-triggered, not an event.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = 0;
        inner.scroll_delta = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gesture_sets_flag_and_position() {
        let input = GestureState::new();
        input.set_state(SINGLE_TAP, Vec2::new(40.0, 60.0), Vec2::new(40.0, 60.0));
        assert!(input.is_state(SINGLE_TAP));
        assert!(!input.is_state(FLING));
        assert_eq!(input.main_x(), 40.0);
        assert_eq!(input.main_y(), 60.0);
    }

    #[test]
    fn gestures_coalesce_between_ticks() {
        let input = GestureState::new();
        input.set_scroll_state(
            SCROLL,
            Vec2::new(1.0, 1.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 5.0),
        );
        input.set_state(FLING, Vec2::new(3.0, 3.0), Vec2::new(4.0, 4.0));
        // Both bits pend; a mask covering either matches.
        assert!(input.is_state(SCROLL));
        assert!(input.is_state(FLING));
        assert!(input.is_state(SCROLL | FLING));
        assert!(!input.is_state(LONG_PRESS));
    }

    #[test]
    fn clear_drops_flags_and_deltas() {
        let input = GestureState::new();
        input.set_scroll_state(
            SCROLL,
            Vec2::new(1.0, 1.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(7.0, -3.0),
        );
        assert_eq!(input.scroll_delta_x(), 7.0);
        input.clear();
        assert!(!input.is_state(SCROLL));
        assert_eq!(input.scroll_delta_x(), 0.0);
        assert_eq!(input.scroll_delta_y(), 0.0);
    }

    #[test]
    fn key_state_is_level_triggered() {
        let input = GestureState::new();
        input.key_down(32);
        assert!(input.is_key_down(32));
        // Gesture clear does not release held keys.
        input.clear();
        assert!(input.is_key_down(32));
        input.key_up(32);
        assert!(!input.is_key_down(32));
    }

    #[test]
    fn secondary_position_tracks_latest_gesture() {
        let input = GestureState::new();
        input.set_state(FLING, Vec2::new(0.0, 0.0), Vec2::new(10.0, 20.0));
        assert_eq!(input.secondary_pos(), Vec2::new(10.0, 20.0));
    }
}
