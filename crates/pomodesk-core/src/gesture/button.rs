use serde::{Deserialize, Serialize};

use crate::devices::Level;

/// Debounce phase of one button.
///
/// ```text
/// Released -> DebouncingPress -> Pressed -> DebouncingRelease -> Released
///     \___________ (outside window) __^          |       ^
///                                                 +-------+ (bounce)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressPhase {
    #[default]
    Released,
    /// Line went low inside the debounce window; ignored until it goes high again.
    DebouncingPress,
    Pressed,
    /// Line went high once; a second high sample completes the release.
    DebouncingRelease,
}

/// Edge detector with a minimum spacing between registered presses.
#[derive(Debug, Clone)]
pub struct ButtonDebouncer {
    phase: PressPhase,
    last_press_ms: Option<u64>,
    debounce_ms: u64,
}

impl ButtonDebouncer {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            phase: PressPhase::Released,
            last_press_ms: None,
            debounce_ms,
        }
    }

    pub fn phase(&self) -> PressPhase {
        self.phase
    }

    pub fn last_press_ms(&self) -> Option<u64> {
        self.last_press_ms
    }

    /// No registered press within the last `debounce_ms`.
    pub fn debounce_elapsed(&self, now_ms: u64) -> bool {
        self.last_press_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.debounce_ms)
    }

    /// Feed one raw sample. Returns true exactly when a press is registered.
    pub fn poll(&mut self, level: Level, now_ms: u64) -> bool {
        let low = level.is_low();
        let (next, pressed) = match (self.phase, low) {
            (PressPhase::Released, true) if self.debounce_elapsed(now_ms) => {
                (PressPhase::Pressed, true)
            }
            (PressPhase::Released, true) => (PressPhase::DebouncingPress, false),
            (PressPhase::Released, false) => (PressPhase::Released, false),
            (PressPhase::DebouncingPress, true) => (PressPhase::DebouncingPress, false),
            (PressPhase::DebouncingPress, false) => (PressPhase::Released, false),
            (PressPhase::Pressed, true) => (PressPhase::Pressed, false),
            (PressPhase::Pressed, false) => (PressPhase::DebouncingRelease, false),
            (PressPhase::DebouncingRelease, true) => (PressPhase::Pressed, false),
            (PressPhase::DebouncingRelease, false) => (PressPhase::Released, false),
        };
        self.phase = next;
        if pressed {
            self.last_press_ms = Some(now_ms);
        }
        pressed
    }

    /// Treat the button as pressed right now without reporting a press.
    pub fn force_pressed(&mut self, now_ms: u64) {
        self.phase = PressPhase::Pressed;
        self.last_press_ms = Some(now_ms);
    }
}
