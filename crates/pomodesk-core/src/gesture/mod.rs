//! Button gesture classification.
//!
//! Turns raw, bouncy button levels into discrete gestures: single presses,
//! both-button chords and (for the secondary button) single/double clicks.
//! Chords are checked before single presses so a combined action wins over
//! the single-button meaning within the same tick.

mod button;
mod click;

pub use button::{ButtonDebouncer, PressPhase};
pub use click::{ClickClassifier, ClickOutcome};

use serde::{Deserialize, Serialize};

use crate::devices::{Button, ButtonLevels, Level};

/// Default minimum spacing between two registered presses of one button.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;
/// Default window for the second click of a double-click.
pub const DEFAULT_DOUBLE_CLICK_MS: u64 = 350;

/// A classified button gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gesture", content = "button", rename_all = "snake_case")]
pub enum Gesture {
    /// Both buttons held and debounced.
    Chord,
    /// Immediate press of one button.
    Press(Button),
    /// Two secondary presses inside the double-click window.
    DoubleClick,
    /// A secondary press whose double-click window ran out.
    DeferredClick,
}

/// Per-button debouncers plus the double-click classifier for the secondary button.
#[derive(Debug, Clone)]
pub struct GestureDebouncer {
    primary: ButtonDebouncer,
    secondary: ButtonDebouncer,
    clicks: ClickClassifier,
}

impl GestureDebouncer {
    pub fn new(debounce_ms: u64, double_click_ms: u64) -> Self {
        Self {
            primary: ButtonDebouncer::new(debounce_ms),
            secondary: ButtonDebouncer::new(debounce_ms),
            clicks: ClickClassifier::new(double_click_ms),
        }
    }

    fn button_mut(&mut self, button: Button) -> &mut ButtonDebouncer {
        match button {
            Button::Primary => &mut self.primary,
            Button::Secondary => &mut self.secondary,
        }
    }

    pub fn click_pending(&self) -> bool {
        self.clicks.is_pending()
    }

    /// Both lines low and both buttons outside their own debounce window.
    pub fn chord_armed(&self, levels: ButtonLevels, now_ms: u64) -> bool {
        levels.both_low()
            && self.primary.debounce_elapsed(now_ms)
            && self.secondary.debounce_elapsed(now_ms)
    }

    /// Consume a chord that was acted upon: both buttons count as pressed now,
    /// so neither produces a single press for the same hold.
    pub fn commit_chord(&mut self, now_ms: u64) {
        self.primary.force_pressed(now_ms);
        self.secondary.force_pressed(now_ms);
        self.clicks.cancel();
        tracing::debug!(at = now_ms, "chord");
    }

    /// Fire the deferred single click once its window ran out or the
    /// double-click context went away.
    pub fn expire_click(&mut self, now_ms: u64, eligible: bool) -> Option<Gesture> {
        self.clicks
            .expire(now_ms, eligible)
            .then_some(Gesture::DeferredClick)
    }

    /// Feed one raw sample; true when it registers a new press.
    pub fn poll_press(&mut self, button: Button, level: Level, now_ms: u64) -> bool {
        let pressed = self.button_mut(button).poll(level, now_ms);
        if pressed {
            tracing::debug!(?button, at = now_ms, "button press");
        }
        pressed
    }

    /// Classify a registered secondary press.
    ///
    /// Outside a double-click context the press is reported immediately and any
    /// pending click is dropped. Inside it, the first press is held back and the
    /// second one inside the window becomes a double-click.
    pub fn classify_secondary(&mut self, now_ms: u64, eligible: bool) -> Option<Gesture> {
        if !eligible {
            self.clicks.cancel();
            return Some(Gesture::Press(Button::Secondary));
        }
        match self.clicks.register(now_ms) {
            ClickOutcome::Pending => None,
            ClickOutcome::Double => Some(Gesture::DoubleClick),
        }
    }

    pub fn cancel_pending_click(&mut self) {
        self.clicks.cancel();
    }
}

impl Default for GestureDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS, DEFAULT_DOUBLE_CLICK_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOW_LOW: ButtonLevels = ButtonLevels {
        primary: Level::Low,
        secondary: Level::Low,
    };

    #[test]
    fn chord_needs_both_debounce_windows() {
        let mut g = GestureDebouncer::default();
        assert!(g.poll_press(Button::Primary, Level::Low, 1_000));
        assert!(!g.chord_armed(LOW_LOW, 1_100));
        assert!(g.chord_armed(LOW_LOW, 1_200));
    }

    #[test]
    fn committed_chord_swallows_single_presses() {
        let mut g = GestureDebouncer::default();
        assert!(g.chord_armed(LOW_LOW, 1_000));
        g.commit_chord(1_000);
        assert!(!g.poll_press(Button::Primary, Level::Low, 1_000));
        assert!(!g.poll_press(Button::Secondary, Level::Low, 1_000));
        assert!(!g.chord_armed(LOW_LOW, 1_100));
        // Held long enough, the chord re-arms.
        assert!(g.chord_armed(LOW_LOW, 1_200));
    }

    #[test]
    fn secondary_double_click_in_context() {
        let mut g = GestureDebouncer::default();
        assert_eq!(g.classify_secondary(1_000, true), None);
        assert!(g.click_pending());
        assert_eq!(g.classify_secondary(1_300, true), Some(Gesture::DoubleClick));
        assert!(!g.click_pending());
    }

    #[test]
    fn secondary_single_click_deferred_until_window_ends() {
        let mut g = GestureDebouncer::default();
        assert_eq!(g.classify_secondary(1_000, true), None);
        assert_eq!(g.expire_click(1_350, true), None);
        assert_eq!(g.expire_click(1_351, true), Some(Gesture::DeferredClick));
        assert_eq!(g.expire_click(1_400, true), None);
    }

    #[test]
    fn losing_context_fires_pending_click() {
        let mut g = GestureDebouncer::default();
        g.classify_secondary(1_000, true);
        assert_eq!(g.expire_click(1_010, false), Some(Gesture::DeferredClick));
    }

    #[test]
    fn out_of_context_press_is_immediate() {
        let mut g = GestureDebouncer::default();
        g.classify_secondary(1_000, true);
        assert_eq!(
            g.classify_secondary(1_100, false),
            Some(Gesture::Press(Button::Secondary))
        );
        assert!(!g.click_pending());
    }
}
