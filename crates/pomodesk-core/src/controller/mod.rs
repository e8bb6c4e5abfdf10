//! Top-level application controller.
//!
//! Owns the timer, the presence monitor, the gesture debouncer and the
//! gambling table, and merges their inputs into one mode state machine.
//! [`AppController::tick`] is the whole control loop body: it samples the
//! inputs, turns them into [`InputEvent`]s in priority order, runs each through
//! [`AppController::dispatch`] and hands the resulting [`Effect`]s to the
//! display and feedback sinks.

mod dispatch;
mod effects;

pub use dispatch::{InputEvent, Transition};
pub use effects::{Effect, Screen};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::devices::{Button, Cue, Devices, IdleTab, LightScene, ShakeFlag};
use crate::error::Result;
use crate::events::Event;
use crate::gambling::GamblingTable;
use crate::gesture::{Gesture, GestureDebouncer};
use crate::menu::MenuCursor;
use crate::presence::PresenceMonitor;
use crate::timer::{PomodoroState, PomodoroTimer};

/// Data-free view of the active mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppMode {
    Normal,
    Settings,
    MenuBrowse,
    Gambling,
}

/// Duration being edited on the settings screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SettingsDraft {
    pub(crate) tab: IdleTab,
    pub(crate) minutes: u32,
    /// Entering settings with a chord leaves both buttons held; nothing may be
    /// confirmed until they have been let go.
    pub(crate) require_release: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModeState {
    Normal,
    Settings(SettingsDraft),
    MenuBrowse,
    Gambling,
}

impl From<ModeState> for AppMode {
    fn from(mode: ModeState) -> Self {
        match mode {
            ModeState::Normal => AppMode::Normal,
            ModeState::Settings(_) => AppMode::Settings,
            ModeState::MenuBrowse => AppMode::MenuBrowse,
            ModeState::Gambling => AppMode::Gambling,
        }
    }
}

/// Everything one control tick produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub at_ms: u64,
    pub effects: Vec<Effect>,
    pub events: Vec<Event>,
    pub transitions: Vec<(AppMode, AppMode)>,
}

impl TickReport {
    fn absorb(&mut self, transition: Transition) {
        if transition.changed_mode() {
            self.transitions.push((transition.from, transition.to));
        }
        self.effects.extend(transition.effects);
        self.events.extend(transition.events);
    }
}

pub struct AppController {
    config: Config,
    devices: Devices,
    timer: PomodoroTimer,
    presence: PresenceMonitor,
    gestures: GestureDebouncer,
    gambling: GamblingTable,
    cursor: MenuCursor,
    mode: ModeState,
    selected_tab: IdleTab,
    user_lost: bool,
    shake_flag: ShakeFlag,
    settings_reentry_block_until: u64,
    last_shake_ms: Option<u64>,
    last_presence_sample_ms: Option<u64>,
    last_refresh_ms: Option<u64>,
    hold_until: Option<u64>,
    last_screen: Option<Screen>,
}

impl AppController {
    /// Build a controller around `devices` and attach the shake sensor.
    ///
    /// `seed` makes gambling outcomes reproducible.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(config: Config, mut devices: Devices, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let shake_flag = ShakeFlag::new();
        devices.shake.attach(shake_flag.clone());
        Ok(Self {
            timer: PomodoroTimer::new(config.durations.clone()),
            presence: PresenceMonitor::new(config.presence.range_threshold_cm),
            gestures: GestureDebouncer::new(
                config.timing.debounce_ms,
                config.timing.double_click_ms,
            ),
            gambling: GamblingTable::new(seed),
            cursor: MenuCursor::default(),
            mode: ModeState::Normal,
            selected_tab: IdleTab::default(),
            user_lost: false,
            shake_flag,
            settings_reentry_block_until: 0,
            last_shake_ms: None,
            last_presence_sample_ms: None,
            last_refresh_ms: None,
            hold_until: None,
            last_screen: None,
            config,
            devices,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> AppMode {
        self.mode.into()
    }

    pub fn timer(&self) -> &PomodoroTimer {
        &self.timer
    }

    pub fn presence(&self) -> &PresenceMonitor {
        &self.presence
    }

    pub fn cursor(&self) -> MenuCursor {
        self.cursor
    }

    pub fn selected_tab(&self) -> IdleTab {
        self.selected_tab
    }

    pub fn is_user_lost(&self) -> bool {
        self.user_lost
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Minutes shown on the settings screen, while in settings.
    pub fn settings_minutes(&self) -> Option<u32> {
        match self.mode {
            ModeState::Settings(draft) => Some(draft.minutes),
            _ => None,
        }
    }

    /// Handle for delivering shake events from outside the control loop.
    pub fn shake_flag(&self) -> ShakeFlag {
        self.shake_flag.clone()
    }

    /// Last screen directive issued.
    pub fn current_screen(&self) -> Option<Screen> {
        self.last_screen
    }

    /// Whether a secondary press may still turn into a double-click.
    pub fn double_click_eligible(&self, now_ms: u64) -> bool {
        self.mode == ModeState::Normal
            && self.timer.state() == PomodoroState::Idle
            && now_ms >= self.settings_reentry_block_until
    }

    fn shake_cooldown_elapsed(&self, now_ms: u64) -> bool {
        self.last_shake_ms.map_or(true, |last| {
            now_ms.saturating_sub(last) >= self.config.timing.shake_cooldown_ms
        })
    }

    // ── Control loop ─────────────────────────────────────────────────

    /// Power-on sequence: greeting cue, lights off, presence baseline, idle screen.
    pub fn boot(&mut self) -> TickReport {
        let now = self.devices.clock.now_ms();
        let mut t = Transition::new(self.mode());
        t.effects.push(Effect::Cue(Cue::TurnOn));
        t.effects.push(Effect::Lights(LightScene::Off));
        let baseline = self.devices.presence.sample_once();
        self.presence.record_baseline(baseline);
        self.show(&mut t, self.normal_screen());
        self.last_refresh_ms = Some(now);
        tracing::info!(at = now, "controller booted");

        let mut report = TickReport {
            at_ms: now,
            ..TickReport::default()
        };
        report.absorb(t);
        self.deliver(&report.effects);
        report
    }

    /// One pass of the control loop.
    pub fn tick(&mut self) -> TickReport {
        let now = self.devices.clock.now_ms();
        let mut report = TickReport {
            at_ms: now,
            ..TickReport::default()
        };

        report.events.extend(self.timer.tick(now));
        if self.timer.consume_finished() {
            let t = self.dispatch(InputEvent::TimerFinished, now);
            report.absorb(t);
        }

        if matches!(self.mode, ModeState::Settings(_)) && self.shake_flag.take() {
            tracing::debug!("shake ignored in settings");
        }

        let levels = self.devices.buttons.read();
        if let ModeState::Settings(draft) = &mut self.mode {
            if draft.require_release && levels.both_high() {
                draft.require_release = false;
            }
        }

        if self.gestures.chord_armed(levels, now) {
            let t = self.dispatch(InputEvent::Chord, now);
            if t.consumed {
                self.gestures.commit_chord(now);
            }
            report.absorb(t);
        }

        let eligible = self.double_click_eligible(now);
        if let Some(gesture) = self.gestures.expire_click(now, eligible) {
            let t = self.dispatch(gesture.into(), now);
            report.absorb(t);
        }

        if self.gestures.poll_press(Button::Primary, levels.primary, now) {
            let t = self.dispatch(Gesture::Press(Button::Primary).into(), now);
            report.absorb(t);
        }

        if self
            .gestures
            .poll_press(Button::Secondary, levels.secondary, now)
        {
            let gesture = if self.mode == ModeState::Normal {
                let eligible = self.double_click_eligible(now);
                self.gestures.classify_secondary(now, eligible)
            } else {
                Some(Gesture::Press(Button::Secondary))
            };
            if let Some(gesture) = gesture {
                let t = self.dispatch(gesture.into(), now);
                report.absorb(t);
            }
        }

        if let Some(within_range) = self.poll_presence(now) {
            let t = self.dispatch(InputEvent::PresenceWindow { within_range }, now);
            report.absorb(t);
        }

        if self.shake_flag.take() {
            let t = self.dispatch(InputEvent::Shake, now);
            report.absorb(t);
        }

        if let Some(screen) = self.refresh_display(now) {
            report.effects.push(Effect::Screen(screen));
        }

        self.deliver(&report.effects);
        report
    }

    fn deliver(&mut self, effects: &[Effect]) {
        let Devices {
            display, feedback, ..
        } = &mut self.devices;
        for effect in effects {
            effect.apply(display.as_mut(), feedback.as_mut());
        }
    }

    /// Take a presence sample when due; returns the verdict once a window is full.
    fn poll_presence(&mut self, now_ms: u64) -> Option<bool> {
        let monitored = self.mode == ModeState::Normal
            && matches!(self.timer.state(), PomodoroState::Work | PomodoroState::Paused);
        if !monitored {
            return None;
        }
        let interval = self.config.timing.presence_sample_interval_ms;
        let due = self
            .last_presence_sample_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= interval);
        if !due {
            return None;
        }
        self.last_presence_sample_ms = Some(now_ms);
        self.presence.sample(self.devices.presence.as_mut());
        self.presence.evaluate()
    }

    /// End an expired hold, or redraw the normal screen when it changed.
    fn refresh_display(&mut self, now_ms: u64) -> Option<Screen> {
        if let Some(until) = self.hold_until {
            if now_ms < until {
                return None;
            }
            self.hold_until = None;
            self.last_refresh_ms = Some(now_ms);
            let screen = self.mode_screen();
            self.last_screen = Some(screen);
            return Some(screen);
        }

        if self.mode != ModeState::Normal {
            return None;
        }
        let interval = if self.timer.state() == PomodoroState::Idle {
            self.config.timing.idle_display_refresh_ms
        } else {
            self.config.timing.display_refresh_ms
        };
        let due = self
            .last_refresh_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= interval);
        if !due {
            return None;
        }
        self.last_refresh_ms = Some(now_ms);
        let screen = self.normal_screen();
        if self.last_screen == Some(screen) {
            return None;
        }
        self.last_screen = Some(screen);
        Some(screen)
    }

    // ── Screens ──────────────────────────────────────────────────────

    fn normal_screen(&self) -> Screen {
        let completed = self.timer.completed_work_sessions();
        match self.timer.state() {
            PomodoroState::Idle => Screen::Idle {
                tab: self.selected_tab,
                completed,
            },
            state => Screen::Running {
                state,
                remaining_secs: self.timer.remaining_secs(),
                completed,
            },
        }
    }

    fn menu_screen(&self) -> Screen {
        Screen::Menu {
            index: self.cursor.index(),
            total: self.cursor.total(),
        }
    }

    /// What the active mode shows when nothing is held on screen.
    fn mode_screen(&self) -> Screen {
        match self.mode {
            ModeState::Normal => self.normal_screen(),
            ModeState::Settings(draft) => Screen::Settings {
                tab: draft.tab,
                minutes: draft.minutes,
            },
            ModeState::MenuBrowse => self.menu_screen(),
            ModeState::Gambling => Screen::GamblingIntro,
        }
    }

    /// Push a screen directive; cancels any hold.
    fn show(&mut self, t: &mut Transition, screen: Screen) {
        self.hold_until = None;
        self.last_screen = Some(screen);
        t.effects.push(Effect::Screen(screen));
    }

    /// Push a screen that stays up for `hold_ms` before the mode screen returns.
    fn show_held(&mut self, t: &mut Transition, screen: Screen, now_ms: u64, hold_ms: u64) {
        self.show(t, screen);
        self.hold_until = Some(now_ms.saturating_add(hold_ms));
    }
}

impl Drop for AppController {
    fn drop(&mut self) {
        self.devices.shake.detach();
    }
}
