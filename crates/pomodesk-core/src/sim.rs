//! In-memory devices and a scripted scenario runner.
//!
//! Every device here is a cheap handle over shared state, so a test (or the
//! `simulate` command) keeps one clone to drive inputs and inspect outputs
//! while the controller owns the other. Time only moves when the harness
//! advances the [`ManualClock`], which makes whole runs reproducible.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::controller::{AppController, Screen, TickReport};
use crate::devices::{
    Button, ButtonInputs, ButtonLevels, Clock, Cue, Devices, Display, Feedback, IdleTab, Level,
    LightScene, PresenceSensor, ShakeFlag, ShakeSensor,
};
use crate::error::Result;
use crate::gambling::GamblingChoice;
use crate::menu::StaticMenu;
use crate::presence::Distance;
use crate::timer::PomodoroState;

/// Clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self(Rc::new(Cell::new(start_ms)))
    }

    pub fn set(&self, now_ms: u64) {
        self.0.set(now_ms);
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get().saturating_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

/// Button lines set directly by the harness.
#[derive(Debug, Clone, Default)]
pub struct SimButtons(Rc<Cell<ButtonLevels>>);

impl SimButtons {
    pub fn set_level(&self, button: Button, level: Level) {
        let mut levels = self.0.get();
        match button {
            Button::Primary => levels.primary = level,
            Button::Secondary => levels.secondary = level,
        }
        self.0.set(levels);
    }

    pub fn press(&self, button: Button) {
        self.set_level(button, Level::Low);
    }

    pub fn release(&self, button: Button) {
        self.set_level(button, Level::High);
    }

    pub fn levels(&self) -> ButtonLevels {
        self.0.get()
    }
}

impl ButtonInputs for SimButtons {
    fn read(&mut self) -> ButtonLevels {
        self.0.get()
    }
}

#[derive(Debug, Default)]
struct PresenceScript {
    queued: VecDeque<Distance>,
    standing: Distance,
    taken: usize,
}

/// Ranging sensor replaying queued readings, then a standing reading.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPresence(Rc<RefCell<PresenceScript>>);

impl ScriptedPresence {
    /// Reading returned whenever the queue is empty.
    pub fn set(&self, reading: Distance) {
        self.0.borrow_mut().standing = reading;
    }

    pub fn queue(&self, readings: impl IntoIterator<Item = Distance>) {
        self.0.borrow_mut().queued.extend(readings);
    }

    pub fn samples_taken(&self) -> usize {
        self.0.borrow().taken
    }
}

impl PresenceSensor for ScriptedPresence {
    fn sample_once(&mut self) -> Distance {
        let mut script = self.0.borrow_mut();
        script.taken += 1;
        let standing = script.standing;
        script.queued.pop_front().unwrap_or(standing)
    }
}

/// Vibration sensor fired by hand.
#[derive(Debug, Clone, Default)]
pub struct SimShake(Rc<RefCell<Option<ShakeFlag>>>);

impl SimShake {
    /// Deliver one shake edge. Returns false when no controller is attached.
    pub fn trigger(&self) -> bool {
        match self.0.borrow().as_ref() {
            Some(flag) => {
                flag.notify();
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.0.borrow().is_some()
    }
}

impl ShakeSensor for SimShake {
    fn attach(&mut self, flag: ShakeFlag) {
        *self.0.borrow_mut() = Some(flag);
    }

    fn detach(&mut self) {
        *self.0.borrow_mut() = None;
    }
}

/// Display that keeps every rendered screen.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay(Rc<RefCell<Vec<Screen>>>);

impl RecordingDisplay {
    pub fn screens(&self) -> Vec<Screen> {
        self.0.borrow().clone()
    }

    pub fn last(&self) -> Option<Screen> {
        self.0.borrow().last().copied()
    }

    fn push(&self, screen: Screen) {
        self.0.borrow_mut().push(screen);
    }
}

impl Display for RecordingDisplay {
    fn show_idle(&mut self, tab: IdleTab, completed: u32) {
        self.push(Screen::Idle { tab, completed });
    }

    fn show_running(&mut self, state: PomodoroState, remaining_secs: u64, completed: u32) {
        self.push(Screen::Running {
            state,
            remaining_secs,
            completed,
        });
    }

    fn show_finished(&mut self, completed: u32) {
        self.push(Screen::Finished { completed });
    }

    fn show_settings(&mut self, label: &str, minutes: u32) {
        let tab = if label == IdleTab::Break.settings_label() {
            IdleTab::Break
        } else {
            IdleTab::Work
        };
        self.push(Screen::Settings { tab, minutes });
    }

    fn show_menu(&mut self, index: usize, total: usize) {
        self.push(Screen::Menu { index, total });
    }

    fn show_gambling_intro(&mut self) {
        self.push(Screen::GamblingIntro);
    }

    fn show_gambling_result(&mut self, choice: GamblingChoice, win: bool) {
        self.push(Screen::GamblingResult { choice, win });
    }
}

#[derive(Debug, Default)]
struct FeedbackLog {
    cues: Vec<Cue>,
    lights: Vec<LightScene>,
}

/// Buzzer and lights that only remember what they were asked to do.
#[derive(Debug, Clone, Default)]
pub struct RecordingFeedback(Rc<RefCell<FeedbackLog>>);

impl RecordingFeedback {
    pub fn cues(&self) -> Vec<Cue> {
        self.0.borrow().cues.clone()
    }

    pub fn lights(&self) -> Vec<LightScene> {
        self.0.borrow().lights.clone()
    }

    pub fn current_lights(&self) -> Option<LightScene> {
        self.0.borrow().lights.last().copied()
    }
}

impl Feedback for RecordingFeedback {
    fn cue(&mut self, cue: Cue) {
        self.0.borrow_mut().cues.push(cue);
    }

    fn lights(&mut self, scene: LightScene) {
        self.0.borrow_mut().lights.push(scene);
    }
}

/// Which button(s) a scenario step acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonTarget {
    Primary,
    Secondary,
    Both,
}

impl ButtonTarget {
    fn buttons(self) -> &'static [Button] {
        match self {
            ButtonTarget::Primary => &[Button::Primary],
            ButtonTarget::Secondary => &[Button::Secondary],
            ButtonTarget::Both => &[Button::Primary, Button::Secondary],
        }
    }
}

fn default_tap_hold_ms() -> u64 {
    50
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    Press {
        button: ButtonTarget,
    },
    Release {
        button: ButtonTarget,
    },
    /// Press, then release after `hold_ms`.
    Tap {
        button: ButtonTarget,
        #[serde(default = "default_tap_hold_ms")]
        hold_ms: u64,
    },
    Shake,
    /// Standing sensor reading from now on; negative means no echo.
    Distance {
        cm: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: StepAction,
}

/// A timed input script.
///
/// ```toml
/// until_ms = 5000
///
/// [[step]]
/// at_ms = 100
/// action = "tap"
/// button = "primary"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Stop time; defaults to five seconds after the last step.
    #[serde(default)]
    pub until_ms: Option<u64>,
    #[serde(default, rename = "step")]
    pub steps: Vec<ScenarioStep>,
}

/// Run-out after the last step when a scenario has no explicit end.
const SCENARIO_TAIL_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy)]
enum Primitive {
    Level(Button, Level),
    Shake,
    Distance(Distance),
}

impl Scenario {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| crate::error::ConfigError::ParseFailed(e.to_string()).into())
    }

    pub fn end_ms(&self) -> u64 {
        self.until_ms.unwrap_or_else(|| {
            self.steps
                .iter()
                .map(|s| match s.action {
                    StepAction::Tap { hold_ms, .. } => s.at_ms.saturating_add(hold_ms),
                    _ => s.at_ms,
                })
                .max()
                .unwrap_or(0)
                .saturating_add(SCENARIO_TAIL_MS)
        })
    }

    /// Flatten taps into press/release pairs, ordered by time.
    fn timeline(&self) -> Vec<(u64, Primitive)> {
        let mut out = Vec::new();
        for step in &self.steps {
            match step.action {
                StepAction::Press { button } => out.extend(
                    button
                        .buttons()
                        .iter()
                        .map(|b| (step.at_ms, Primitive::Level(*b, Level::Low))),
                ),
                StepAction::Release { button } => out.extend(
                    button
                        .buttons()
                        .iter()
                        .map(|b| (step.at_ms, Primitive::Level(*b, Level::High))),
                ),
                StepAction::Tap { button, hold_ms } => {
                    for b in button.buttons() {
                        out.push((step.at_ms, Primitive::Level(*b, Level::Low)));
                        out.push((
                            step.at_ms.saturating_add(hold_ms),
                            Primitive::Level(*b, Level::High),
                        ));
                    }
                }
                StepAction::Shake => out.push((step.at_ms, Primitive::Shake)),
                StepAction::Distance { cm } => {
                    out.push((step.at_ms, Primitive::Distance(Distance::from_raw_cm(cm))))
                }
            }
        }
        out.sort_by_key(|(at, _)| *at);
        out
    }
}

/// A controller wired to simulated devices, plus handles to all of them.
pub struct SimRig {
    pub controller: AppController,
    pub clock: ManualClock,
    pub buttons: SimButtons,
    pub presence: ScriptedPresence,
    pub shake: SimShake,
    pub display: RecordingDisplay,
    pub feedback: RecordingFeedback,
    step_ms: u64,
}

impl SimRig {
    pub fn new(config: Config, seed: Option<u64>) -> Result<Self> {
        Self::with_menu(config, StaticMenu::default(), seed)
    }

    pub fn with_menu(config: Config, menu: StaticMenu, seed: Option<u64>) -> Result<Self> {
        let clock = ManualClock::new(0);
        let buttons = SimButtons::default();
        let presence = ScriptedPresence::default();
        let shake = SimShake::default();
        let display = RecordingDisplay::default();
        let feedback = RecordingFeedback::default();
        let step_ms = config.timing.tick_interval_ms;
        let devices = Devices {
            clock: Box::new(clock.clone()),
            buttons: Box::new(buttons.clone()),
            presence: Box::new(presence.clone()),
            shake: Box::new(shake.clone()),
            menu: Box::new(menu),
            display: Box::new(display.clone()),
            feedback: Box::new(feedback.clone()),
        };
        let controller = AppController::new(config, devices, seed)?;
        Ok(Self {
            controller,
            clock,
            buttons,
            presence,
            shake,
            display,
            feedback,
            step_ms,
        })
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn boot(&mut self) -> TickReport {
        self.controller.boot()
    }

    pub fn tick(&mut self) -> TickReport {
        self.controller.tick()
    }

    /// Tick at the configured cadence for `ms` milliseconds.
    pub fn advance(&mut self, ms: u64) -> Vec<TickReport> {
        let target = self.now_ms().saturating_add(ms);
        let mut reports = Vec::new();
        while self.now_ms() < target {
            let step = self.step_ms.min(target - self.now_ms());
            self.clock.advance(step);
            reports.push(self.controller.tick());
        }
        reports
    }

    /// Press `button`, hold it for `hold_ms`, release it and let it settle.
    pub fn tap(&mut self, button: Button, hold_ms: u64) -> Vec<TickReport> {
        self.buttons.press(button);
        let mut reports = vec![self.controller.tick()];
        reports.extend(self.advance(hold_ms));
        self.buttons.release(button);
        reports.extend(self.advance(self.step_ms * 2));
        reports
    }

    /// Hold both buttons, release them and let them settle.
    pub fn chord(&mut self, hold_ms: u64) -> Vec<TickReport> {
        self.buttons.press(Button::Primary);
        self.buttons.press(Button::Secondary);
        let mut reports = vec![self.controller.tick()];
        reports.extend(self.advance(hold_ms));
        self.buttons.release(Button::Primary);
        self.buttons.release(Button::Secondary);
        reports.extend(self.advance(self.step_ms * 2));
        reports
    }

    /// Replay `scenario` from the current time. Only ticks that produced
    /// effects or events are returned.
    pub fn run(&mut self, scenario: &Scenario) -> Vec<TickReport> {
        let end = scenario.end_ms();
        let mut pending = scenario.timeline().into_iter().peekable();
        let mut reports = Vec::new();
        loop {
            let now = self.now_ms();
            while let Some((_, primitive)) = pending.next_if(|(at, _)| *at <= now) {
                self.apply(primitive);
            }
            let report = self.controller.tick();
            if !report.effects.is_empty() || !report.events.is_empty() {
                reports.push(report);
            }
            if now >= end {
                break;
            }
            self.clock.advance(self.step_ms.min(end - now));
        }
        reports
    }

    fn apply(&mut self, primitive: Primitive) {
        match primitive {
            Primitive::Level(button, level) => self.buttons.set_level(button, level),
            Primitive::Shake => {
                if !self.shake.trigger() {
                    tracing::warn!("shake scripted with no controller attached");
                }
            }
            Primitive::Distance(reading) => self.presence.set(reading),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_attaches_and_detaches_shake_sensor() {
        let rig = SimRig::new(Config::default(), Some(1)).unwrap();
        let shake = rig.shake.clone();
        assert!(shake.is_attached());
        drop(rig);
        assert!(!shake.is_attached());
        assert!(!shake.trigger());
    }

    #[test]
    fn scripted_presence_replays_queue_then_standing() {
        let mut sensor = ScriptedPresence::default();
        sensor.set(Distance::Cm(50.0));
        sensor.queue([Distance::Cm(1.0), Distance::NoEcho]);
        assert_eq!(sensor.sample_once(), Distance::Cm(1.0));
        assert_eq!(sensor.sample_once(), Distance::NoEcho);
        assert_eq!(sensor.sample_once(), Distance::Cm(50.0));
        assert_eq!(sensor.samples_taken(), 3);
    }

    #[test]
    fn scenario_parses_from_toml() {
        let scenario = Scenario::from_toml(
            r#"
            until_ms = 2000

            [[step]]
            at_ms = 100
            action = "tap"
            button = "primary"

            [[step]]
            at_ms = 400
            action = "distance"
            cm = -1

            [[step]]
            at_ms = 500
            action = "shake"
            "#,
        )
        .unwrap();
        assert_eq!(scenario.end_ms(), 2000);
        assert_eq!(
            scenario.steps[0].action,
            StepAction::Tap {
                button: ButtonTarget::Primary,
                hold_ms: 50
            }
        );
        assert_eq!(scenario.steps[1].action, StepAction::Distance { cm: -1.0 });
        assert_eq!(scenario.timeline().len(), 4);
    }

    #[test]
    fn scenario_end_defaults_past_last_step() {
        let scenario = Scenario {
            until_ms: None,
            steps: vec![ScenarioStep {
                at_ms: 1_000,
                action: StepAction::Tap {
                    button: ButtonTarget::Both,
                    hold_ms: 300,
                },
            }],
        };
        assert_eq!(scenario.end_ms(), 1_300 + SCENARIO_TAIL_MS);
    }

    #[test]
    fn run_starts_a_session_from_a_script() {
        let mut rig = SimRig::new(Config::default(), Some(1)).unwrap();
        rig.boot();
        let scenario = Scenario {
            until_ms: Some(3_000),
            steps: vec![ScenarioStep {
                at_ms: 100,
                action: StepAction::Tap {
                    button: ButtonTarget::Primary,
                    hold_ms: 50,
                },
            }],
        };
        let reports = rig.run(&scenario);
        assert!(!reports.is_empty());
        assert_eq!(rig.controller.timer().state(), PomodoroState::Work);
        assert_eq!(rig.controller.timer().remaining_secs(), 1500 - 2);
        assert_eq!(rig.now_ms(), 3_000);
    }
}
