use serde::{Deserialize, Serialize};

use crate::devices::{Cue, Display, Feedback, IdleTab, LightScene};
use crate::gambling::GamblingChoice;
use crate::timer::PomodoroState;

/// Everything the display can be asked to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    Idle {
        tab: IdleTab,
        completed: u32,
    },
    Running {
        state: PomodoroState,
        remaining_secs: u64,
        completed: u32,
    },
    Finished {
        completed: u32,
    },
    Settings {
        tab: IdleTab,
        minutes: u32,
    },
    Menu {
        index: usize,
        total: usize,
    },
    GamblingIntro,
    GamblingResult {
        choice: GamblingChoice,
        win: bool,
    },
}

impl Screen {
    pub fn render(&self, display: &mut dyn Display) {
        match *self {
            Screen::Idle { tab, completed } => display.show_idle(tab, completed),
            Screen::Running {
                state,
                remaining_secs,
                completed,
            } => display.show_running(state, remaining_secs, completed),
            Screen::Finished { completed } => display.show_finished(completed),
            Screen::Settings { tab, minutes } => display.show_settings(tab.settings_label(), minutes),
            Screen::Menu { index, total } => display.show_menu(index, total),
            Screen::GamblingIntro => display.show_gambling_intro(),
            Screen::GamblingResult { choice, win } => display.show_gambling_result(choice, win),
        }
    }
}

/// A side-effect directive produced by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Effect {
    Screen(Screen),
    Cue(Cue),
    Lights(LightScene),
}

impl Effect {
    /// Hand the directive to the matching sink.
    pub fn apply(&self, display: &mut dyn Display, feedback: &mut dyn Feedback) {
        match self {
            Effect::Screen(screen) => screen.render(display),
            Effect::Cue(cue) => feedback.cue(*cue),
            Effect::Lights(scene) => feedback.lights(*scene),
        }
    }

    pub fn screen(&self) -> Option<&Screen> {
        match self {
            Effect::Screen(screen) => Some(screen),
            _ => None,
        }
    }
}
