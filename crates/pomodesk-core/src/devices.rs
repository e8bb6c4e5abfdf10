//! Capability interfaces for the hardware around the controller.
//!
//! Every collaborator is injected at construction; the controller never reaches
//! for globals. Sinks (display, feedback) are fire-and-forget from the
//! controller's point of view. Implementations may block for a bounded time
//! (a tone, a sensor pulse timeout) but must never block indefinitely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::gambling::GamblingChoice;
use crate::menu::MenuProvider;
use crate::presence::Distance;
use crate::timer::PomodoroState;

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Clock backed by `std::time::Instant`, counting from construction.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    boot: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.boot.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Electrical level of an input line. Buttons are wired active-low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    High,
    Low,
}

impl Level {
    pub fn is_low(self) -> bool {
        self == Level::Low
    }
}

/// Which of the two physical buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Start / pause, "previous", "red".
    Primary,
    /// Toggle / reset, "next", "black"; the double-click button.
    Secondary,
}

/// Levels of both buttons read in the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ButtonLevels {
    pub primary: Level,
    pub secondary: Level,
}

impl ButtonLevels {
    pub fn level(&self, button: Button) -> Level {
        match button {
            Button::Primary => self.primary,
            Button::Secondary => self.secondary,
        }
    }

    pub fn both_low(&self) -> bool {
        self.primary.is_low() && self.secondary.is_low()
    }

    pub fn both_high(&self) -> bool {
        !self.primary.is_low() && !self.secondary.is_low()
    }
}

/// Two polled digital lines.
pub trait ButtonInputs {
    fn read(&mut self) -> ButtonLevels;
}

/// Single-shot ranging sensor. A failed measurement is `Distance::NoEcho`.
pub trait PresenceSensor {
    fn sample_once(&mut self) -> Distance;
}

/// Set-only-from-interrupt, clear-only-from-tick event bit.
///
/// The asynchronous side calls [`ShakeFlag::notify`]; the control tick calls
/// [`ShakeFlag::take`]. No compound state is shared, so a single atomic is enough.
#[derive(Debug, Clone, Default)]
pub struct ShakeFlag(Arc<AtomicBool>);

impl ShakeFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a shake. Safe to call from any thread or interrupt context.
    pub fn notify(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Drain the event: returns whether a shake happened since the last call.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Edge-triggered vibration sensor delivering events through a [`ShakeFlag`].
pub trait ShakeSensor {
    /// Start delivering edges into `flag`.
    fn attach(&mut self, flag: ShakeFlag);
    /// Stop delivering edges.
    fn detach(&mut self);
}

/// Which idle tab is selected: the session btn1 will start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleTab {
    #[default]
    Work,
    Break,
}

impl IdleTab {
    pub fn toggled(self) -> Self {
        match self {
            IdleTab::Work => IdleTab::Break,
            IdleTab::Break => IdleTab::Work,
        }
    }

    /// Label used on the settings screen.
    pub fn settings_label(self) -> &'static str {
        match self {
            IdleTab::Work => "WORK",
            IdleTab::Break => "BREAK",
        }
    }
}

/// Screen renderer.
pub trait Display {
    fn show_idle(&mut self, tab: IdleTab, completed: u32);
    fn show_running(&mut self, state: PomodoroState, remaining_secs: u64, completed: u32);
    fn show_finished(&mut self, completed: u32);
    fn show_settings(&mut self, label: &str, minutes: u32);
    fn show_menu(&mut self, index: usize, total: usize);
    fn show_gambling_intro(&mut self);
    fn show_gambling_result(&mut self, choice: GamblingChoice, win: bool);
}

/// Short audio/visual cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    Happy,
    Sad,
    TurnOn,
    Win,
    Lose,
    /// User left the desk during a work session.
    Lost,
    /// User came back.
    Returned,
    /// Shake acknowledged.
    Shaken,
}

/// Indicator lights held for the kind of session that is running.
///
/// Cues may still flash the lights on their own; a scene is what the lights
/// settle on between cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightScene {
    Off,
    Work,
    Break,
}

/// Buzzer and lights.
pub trait Feedback {
    fn cue(&mut self, cue: Cue);
    fn lights(&mut self, scene: LightScene);
}

/// Everything the controller talks to.
pub struct Devices {
    pub clock: Box<dyn Clock>,
    pub buttons: Box<dyn ButtonInputs>,
    pub presence: Box<dyn PresenceSensor>,
    pub shake: Box<dyn ShakeSensor>,
    pub menu: Box<dyn MenuProvider>,
    pub display: Box<dyn Display>,
    pub feedback: Box<dyn Feedback>,
}
