//! The mode transition function.
//!
//! `dispatch` interprets one input event in the current mode and returns the
//! resulting transition. Events are delivered by [`AppController::tick`] in
//! priority order, but tests may feed them directly with a synthetic clock.

use serde::{Deserialize, Serialize};

use super::{AppController, AppMode, Effect, ModeState, Screen, SettingsDraft};
use crate::devices::{Button, Cue, IdleTab, LightScene};
use crate::events::Event;
use crate::gambling::GamblingChoice;
use crate::gesture::Gesture;
use crate::timer::PomodoroState;

/// One classified input, ready for the transition function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    Chord,
    Press { button: Button },
    DoubleClick,
    /// Secondary single click released after its double-click window.
    DeferredClick,
    Shake,
    TimerFinished,
    PresenceWindow { within_range: bool },
}

impl From<Gesture> for InputEvent {
    fn from(gesture: Gesture) -> Self {
        match gesture {
            Gesture::Chord => InputEvent::Chord,
            Gesture::Press(button) => InputEvent::Press { button },
            Gesture::DoubleClick => InputEvent::DoubleClick,
            Gesture::DeferredClick => InputEvent::DeferredClick,
        }
    }
}

/// Outcome of one dispatched event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: AppMode,
    pub to: AppMode,
    /// False when the event meant nothing in the current mode.
    pub consumed: bool,
    pub effects: Vec<Effect>,
    /// Timer lifecycle events caused by this transition.
    pub events: Vec<Event>,
}

impl Transition {
    pub(crate) fn new(from: AppMode) -> Self {
        Self {
            from,
            to: from,
            consumed: true,
            effects: Vec::new(),
            events: Vec::new(),
        }
    }

    fn ignored(&mut self) {
        self.consumed = false;
    }

    fn record(&mut self, event: Option<Event>) {
        self.events.extend(event);
    }

    pub fn changed_mode(&self) -> bool {
        self.from != self.to
    }
}

impl AppController {
    /// Interpret `event` at `now_ms` and apply it to the sub-machines.
    ///
    /// The returned effects are not yet delivered to the display or feedback
    /// sinks; [`AppController::tick`] does that.
    pub fn dispatch(&mut self, event: InputEvent, now_ms: u64) -> Transition {
        let mut t = Transition::new(self.mode());
        match event {
            InputEvent::Chord => self.on_chord(now_ms, &mut t),
            InputEvent::Press {
                button: Button::Primary,
            } => self.on_primary(now_ms, &mut t),
            InputEvent::Press {
                button: Button::Secondary,
            }
            | InputEvent::DeferredClick => self.on_secondary(now_ms, &mut t),
            InputEvent::DoubleClick => self.on_double_click(now_ms, &mut t),
            InputEvent::Shake => self.on_shake(now_ms, &mut t),
            InputEvent::TimerFinished => self.on_timer_finished(now_ms, &mut t),
            InputEvent::PresenceWindow { within_range } => {
                self.on_presence_window(within_range, now_ms, &mut t)
            }
        }
        t.to = self.mode();
        if t.changed_mode() {
            tracing::info!(from = ?t.from, to = ?t.to, ?event, "mode changed");
        } else if !t.consumed {
            tracing::debug!(mode = ?t.from, ?event, "event ignored");
        }
        t
    }

    // ── Handlers ─────────────────────────────────────────────────────

    fn on_chord(&mut self, now_ms: u64, t: &mut Transition) {
        match self.mode {
            ModeState::Settings(draft) if draft.require_release => t.ignored(),
            ModeState::Settings(draft) => self.confirm_settings(draft, now_ms, t),
            ModeState::MenuBrowse | ModeState::Gambling => self.exit_special_mode(now_ms, t),
            ModeState::Normal => {
                if self.timer.state() == PomodoroState::Idle
                    && now_ms >= self.settings_reentry_block_until
                {
                    self.enter_settings(t);
                } else {
                    t.ignored();
                }
            }
        }
    }

    fn on_primary(&mut self, now_ms: u64, t: &mut Transition) {
        match self.mode {
            ModeState::Settings(draft) => {
                let step = self.config.settings.step_minutes;
                self.adjust_settings(draft, -i64::from(step), t);
            }
            ModeState::Gambling => self.resolve_gamble(GamblingChoice::Red, t, now_ms),
            ModeState::MenuBrowse => {
                if self.cursor.prev() {
                    self.show(t, self.menu_screen());
                }
            }
            ModeState::Normal => match self.timer.state() {
                PomodoroState::Idle => self.start_session(now_ms, t),
                PomodoroState::Paused => {
                    t.record(self.timer.resume(now_ms));
                    self.user_lost = false;
                    self.show(t, self.normal_screen());
                }
                _ => {
                    t.record(self.timer.pause(now_ms));
                    self.show(t, self.normal_screen());
                }
            },
        }
    }

    fn on_secondary(&mut self, now_ms: u64, t: &mut Transition) {
        match self.mode {
            ModeState::Settings(draft) => {
                let step = self.config.settings.step_minutes;
                self.adjust_settings(draft, i64::from(step), t);
            }
            ModeState::Gambling => self.resolve_gamble(GamblingChoice::Black, t, now_ms),
            ModeState::MenuBrowse => {
                if self.cursor.next() {
                    self.show(t, self.menu_screen());
                }
            }
            ModeState::Normal if self.timer.state() == PomodoroState::Idle => {
                self.selected_tab = self.selected_tab.toggled();
                tracing::debug!(tab = ?self.selected_tab, "idle tab toggled");
                self.show(t, self.normal_screen());
            }
            ModeState::Normal => {
                t.record(self.timer.reset(now_ms));
                self.user_lost = false;
                t.effects.push(Effect::Lights(LightScene::Off));
                self.show(t, self.normal_screen());
            }
        }
    }

    fn on_double_click(&mut self, now_ms: u64, t: &mut Transition) {
        if self.double_click_eligible(now_ms) {
            self.enter_settings(t);
        } else {
            t.ignored();
        }
    }

    fn on_shake(&mut self, now_ms: u64, t: &mut Transition) {
        if matches!(self.mode, ModeState::Settings(_)) {
            t.ignored();
            return;
        }
        if !self.shake_cooldown_elapsed(now_ms) {
            tracing::debug!(at = now_ms, "shake ignored during cooldown");
            t.ignored();
            return;
        }
        match self.mode {
            ModeState::Normal => {
                let total = self.devices.menu.item_count();
                self.cursor.reset(total);
                self.mode = ModeState::MenuBrowse;
                self.last_shake_ms = Some(now_ms);
                self.gestures.cancel_pending_click();
                t.effects.push(Effect::Cue(Cue::Shaken));
                self.show(t, self.menu_screen());
            }
            ModeState::MenuBrowse if !self.gambling.choice_pending() => {
                self.gambling.start();
                self.mode = ModeState::Gambling;
                self.last_shake_ms = Some(now_ms);
                self.show(t, Screen::GamblingIntro);
            }
            _ => t.ignored(),
        }
    }

    fn on_timer_finished(&mut self, now_ms: u64, t: &mut Transition) {
        self.user_lost = false;
        t.effects.push(Effect::Cue(Cue::Happy));
        t.effects.push(Effect::Lights(LightScene::Off));
        let completed = self.timer.completed_work_sessions();
        let hold = self.config.timing.finished_screen_ms;
        self.show_held(t, Screen::Finished { completed }, now_ms, hold);
    }

    fn on_presence_window(&mut self, within_range: bool, now_ms: u64, t: &mut Transition) {
        let monitored = matches!(self.timer.state(), PomodoroState::Work | PomodoroState::Paused);
        if self.mode != ModeState::Normal || !monitored {
            t.ignored();
            return;
        }
        match (within_range, self.user_lost) {
            (false, false) => {
                tracing::info!("user out of range, pausing");
                self.user_lost = true;
                t.record(self.timer.pause(now_ms));
                t.effects.push(Effect::Cue(Cue::Sad));
                t.effects.push(Effect::Cue(Cue::Lost));
                self.show(t, self.normal_screen());
            }
            (true, true) => {
                tracing::info!("user back in range, resuming");
                self.user_lost = false;
                t.effects.push(Effect::Cue(Cue::Returned));
                t.record(self.timer.resume(now_ms));
                t.effects.push(Effect::Cue(Cue::Happy));
                self.show(t, self.normal_screen());
            }
            _ => t.ignored(),
        }
    }

    // ── Mode changes ─────────────────────────────────────────────────

    fn enter_settings(&mut self, t: &mut Transition) {
        let tab = self.selected_tab;
        let secs = match tab {
            IdleTab::Work => self.timer.work_duration_secs(),
            IdleTab::Break => self.timer.short_break_duration_secs(),
        };
        let minutes = u32::try_from(secs / 60).unwrap_or(u32::MAX);
        self.mode = ModeState::Settings(SettingsDraft {
            tab,
            minutes,
            require_release: true,
        });
        self.gestures.cancel_pending_click();
        self.show(t, Screen::Settings { tab, minutes });
    }

    fn adjust_settings(&mut self, draft: SettingsDraft, delta: i64, t: &mut Transition) {
        let s = &self.config.settings;
        let (min, max) = match draft.tab {
            IdleTab::Work => (s.work_min_minutes, s.work_max_minutes),
            IdleTab::Break => (s.break_min_minutes, s.break_max_minutes),
        };
        let proposed = i64::from(draft.minutes) + delta;
        let minutes = if proposed > i64::from(max) {
            min
        } else if proposed < i64::from(min) {
            max
        } else {
            // within [min, max], so it fits
            u32::try_from(proposed).unwrap_or(min)
        };
        tracing::debug!(tab = ?draft.tab, minutes, "settings adjusted");
        self.mode = ModeState::Settings(SettingsDraft { minutes, ..draft });
        self.show(
            t,
            Screen::Settings {
                tab: draft.tab,
                minutes,
            },
        );
    }

    fn confirm_settings(&mut self, draft: SettingsDraft, now_ms: u64, t: &mut Transition) {
        let secs = u64::from(draft.minutes) * 60;
        let saved = match draft.tab {
            IdleTab::Work => self.timer.set_work_duration(secs),
            IdleTab::Break => self.timer.set_short_break_duration(secs),
        };
        match saved {
            Ok(()) => tracing::info!(tab = ?draft.tab, minutes = draft.minutes, "settings saved"),
            Err(e) => tracing::warn!(error = %e, "settings rejected, keeping previous duration"),
        }
        self.selected_tab = draft.tab;
        self.mode = ModeState::Normal;
        self.gestures.cancel_pending_click();
        self.settings_reentry_block_until =
            now_ms.saturating_add(self.config.timing.settings_reentry_cooldown_ms);
        self.show(t, self.normal_screen());
    }

    fn exit_special_mode(&mut self, now_ms: u64, t: &mut Transition) {
        if self.mode == ModeState::Gambling {
            self.gambling.cancel();
        }
        self.mode = ModeState::Normal;
        self.settings_reentry_block_until =
            now_ms.saturating_add(self.config.timing.settings_reentry_cooldown_ms);
        self.gestures.cancel_pending_click();
        if self.shake_flag.take() {
            tracing::debug!("stale shake dropped on mode exit");
        }
        self.last_shake_ms = Some(now_ms);
        self.show(t, self.normal_screen());
    }

    fn start_session(&mut self, now_ms: u64, t: &mut Transition) {
        match self.selected_tab {
            IdleTab::Work => {
                t.record(self.timer.start_work(now_ms));
                let baseline = self.devices.presence.sample_once();
                self.presence.record_baseline(baseline);
                self.presence.restart();
                self.user_lost = false;
                self.last_presence_sample_ms = Some(now_ms);
                t.effects.push(Effect::Lights(LightScene::Work));
            }
            IdleTab::Break => {
                t.record(self.timer.start_break(now_ms));
                t.effects.push(Effect::Lights(LightScene::Break));
            }
        }
        self.show(t, self.normal_screen());
    }

    fn resolve_gamble(&mut self, choice: GamblingChoice, t: &mut Transition, now_ms: u64) {
        let Some(win) = self.gambling.register_choice(choice) else {
            t.ignored();
            return;
        };
        self.mode = ModeState::MenuBrowse;
        let hold = self.config.timing.gambling_result_ms;
        self.show_held(t, Screen::GamblingResult { choice, win }, now_ms, hold);
        t.effects
            .push(Effect::Cue(if win { Cue::Win } else { Cue::Lose }));
    }
}
