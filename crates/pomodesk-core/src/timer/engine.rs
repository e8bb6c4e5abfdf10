//! Pomodoro timer engine.
//!
//! The engine is a clock-driven state machine. It does not use internal
//! threads - the caller passes the current monotonic time to `tick()` on every
//! control-loop iteration.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> (Work | ShortBreak | LongBreak) -> Idle
//!               |            ^
//!               v            |
//!             Paused --------+
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = PomodoroTimer::new(SessionDurations::default());
//! timer.start_work(clock.now_ms());
//! // In a loop:
//! timer.tick(clock.now_ms()); // Returns Some(Event) when the session runs out
//! if timer.consume_finished() { /* play completion feedback */ }
//! ```

use serde::{Deserialize, Serialize};

use super::durations::{ensure_nonzero, SessionDurations};
use crate::error::ValidationError;
use crate::events::Event;

const MS_PER_SEC: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PomodoroState {
    Idle,
    Work,
    ShortBreak,
    LongBreak,
    /// Interrupted session; the interrupted state is kept as the pause source.
    Paused,
}

impl PomodoroState {
    /// Counting down right now.
    pub fn is_running(self) -> bool {
        matches!(
            self,
            PomodoroState::Work | PomodoroState::ShortBreak | PomodoroState::LongBreak
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            PomodoroState::Idle => "Idle",
            PomodoroState::Work => "Work",
            PomodoroState::ShortBreak => "Short Break",
            PomodoroState::LongBreak => "Long Break",
            PomodoroState::Paused => "Paused",
        }
    }
}

/// Countdown state machine for work/break/pause cycles.
///
/// Operates on caller-supplied millisecond timestamps. Remaining time is kept
/// in whole seconds; the tick anchor advances by whole seconds only, so the
/// sub-second remainder of one tick carries into the next instead of drifting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PomodoroTimer {
    durations: SessionDurations,
    state: PomodoroState,
    /// State interrupted by the most recent `pause()`.
    #[serde(default)]
    paused_source: Option<PomodoroState>,
    remaining_secs: u64,
    completed_work_sessions: u32,
    /// Monotonic timestamp the countdown is measured against.
    #[serde(default)]
    last_tick_ms: Option<u64>,
    /// One-shot completion flag, cleared by `consume_finished()`.
    #[serde(default)]
    finished: bool,
    #[serde(skip)]
    resume_fallbacks: u32,
}

impl PomodoroTimer {
    /// Create an idle timer with the given session durations.
    pub fn new(durations: SessionDurations) -> Self {
        Self {
            durations,
            state: PomodoroState::Idle,
            paused_source: None,
            remaining_secs: 0,
            completed_work_sessions: 0,
            last_tick_ms: None,
            finished: false,
            resume_fallbacks: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> PomodoroState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work_sessions
    }

    pub fn paused_source(&self) -> Option<PomodoroState> {
        self.paused_source
    }

    pub fn work_duration_secs(&self) -> u64 {
        self.durations.work_secs
    }

    pub fn short_break_duration_secs(&self) -> u64 {
        self.durations.short_break_secs
    }

    pub fn long_break_duration_secs(&self) -> u64 {
        self.durations.long_break_secs
    }

    pub fn state_label(&self) -> &'static str {
        self.state.label()
    }

    /// How many times `resume()` had to fall back to `Work` because no pause
    /// source was recorded. Stays zero unless an invariant was broken.
    pub fn resume_fallbacks(&self) -> u32 {
        self.resume_fallbacks
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start_work(&mut self, now_ms: u64) -> Option<Event> {
        if self.state != PomodoroState::Idle {
            return None;
        }
        let duration = self.durations.work_secs;
        Some(self.begin(PomodoroState::Work, duration, now_ms))
    }

    /// Start a short or long break depending on the completed session count.
    pub fn start_break(&mut self, now_ms: u64) -> Option<Event> {
        if self.state != PomodoroState::Idle {
            return None;
        }
        let (state, duration) = if self.durations.is_long_break_due(self.completed_work_sessions)
        {
            (PomodoroState::LongBreak, self.durations.long_break_secs)
        } else {
            (PomodoroState::ShortBreak, self.durations.short_break_secs)
        };
        Some(self.begin(state, duration, now_ms))
    }

    pub fn pause(&mut self, now_ms: u64) -> Option<Event> {
        if !self.state.is_running() {
            return None;
        }
        let source = self.state;
        self.paused_source = Some(source);
        self.state = PomodoroState::Paused;
        self.last_tick_ms = None;
        tracing::info!(source = source.label(), remaining = self.remaining_secs, "timer paused");
        Some(Event::TimerPaused {
            source,
            remaining_secs: self.remaining_secs,
            at_ms: now_ms,
        })
    }

    pub fn resume(&mut self, now_ms: u64) -> Option<Event> {
        if self.state != PomodoroState::Paused {
            return None;
        }
        let restored = match self.paused_source.take() {
            Some(source) if source.is_running() => source,
            other => {
                self.resume_fallbacks = self.resume_fallbacks.saturating_add(1);
                tracing::warn!(
                    source = ?other,
                    "resume without a recorded pause source, falling back to work"
                );
                PomodoroState::Work
            }
        };
        self.state = restored;
        self.last_tick_ms = Some(now_ms);
        tracing::info!(state = restored.label(), remaining = self.remaining_secs, "timer resumed");
        Some(Event::TimerResumed {
            state: restored,
            remaining_secs: self.remaining_secs,
            at_ms: now_ms,
        })
    }

    /// Back to idle. Clears the completed-session counter; durations are kept.
    pub fn reset(&mut self, now_ms: u64) -> Option<Event> {
        self.state = PomodoroState::Idle;
        self.remaining_secs = 0;
        self.completed_work_sessions = 0;
        self.paused_source = None;
        self.last_tick_ms = None;
        self.finished = false;
        tracing::info!("timer reset");
        Some(Event::TimerReset { at_ms: now_ms })
    }

    /// Call every control tick. Returns `Some(Event::TimerCompleted)` when the
    /// running session reaches zero.
    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        if !self.state.is_running() {
            return None;
        }
        let anchor = *self.last_tick_ms.get_or_insert(now_ms);
        let whole_secs = now_ms.saturating_sub(anchor) / MS_PER_SEC;
        if whole_secs == 0 {
            return None;
        }
        self.last_tick_ms = Some(anchor + whole_secs * MS_PER_SEC);
        self.remaining_secs = self.remaining_secs.saturating_sub(whole_secs);
        if self.remaining_secs > 0 {
            return None;
        }
        Some(self.complete(now_ms))
    }

    /// Read and clear the one-shot finished flag.
    pub fn consume_finished(&mut self) -> bool {
        std::mem::take(&mut self.finished)
    }

    pub fn set_work_duration(&mut self, secs: u64) -> Result<(), ValidationError> {
        ensure_nonzero("work_secs", secs)?;
        self.durations.work_secs = secs;
        Ok(())
    }

    pub fn set_short_break_duration(&mut self, secs: u64) -> Result<(), ValidationError> {
        ensure_nonzero("short_break_secs", secs)?;
        self.durations.short_break_secs = secs;
        Ok(())
    }

    pub fn set_long_break_duration(&mut self, secs: u64) -> Result<(), ValidationError> {
        ensure_nonzero("long_break_secs", secs)?;
        self.durations.long_break_secs = secs;
        Ok(())
    }

    /// Overwrite the remaining time of the current session.
    pub fn set_remaining(&mut self, secs: u64, now_ms: u64) {
        self.remaining_secs = secs;
        self.finished = false;
        self.last_tick_ms = Some(now_ms);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin(&mut self, state: PomodoroState, duration_secs: u64, now_ms: u64) -> Event {
        self.state = state;
        self.remaining_secs = duration_secs;
        self.paused_source = None;
        self.finished = false;
        self.last_tick_ms = Some(now_ms);
        tracing::info!(
            state = state.label(),
            duration_secs,
            completed = self.completed_work_sessions,
            "session started"
        );
        Event::TimerStarted {
            state,
            duration_secs,
            at_ms: now_ms,
        }
    }

    fn complete(&mut self, now_ms: u64) -> Event {
        let expired = self.state;
        if expired == PomodoroState::Work {
            self.completed_work_sessions = self.completed_work_sessions.saturating_add(1);
        }
        self.state = PomodoroState::Idle;
        self.paused_source = None;
        self.last_tick_ms = None;
        self.finished = true;
        tracing::info!(
            state = expired.label(),
            completed = self.completed_work_sessions,
            "session completed"
        );
        Event::TimerCompleted {
            state: expired,
            completed_work_sessions: self.completed_work_sessions,
            at_ms: now_ms,
        }
    }
}

impl Default for PomodoroTimer {
    fn default() -> Self {
        Self::new(SessionDurations::default())
    }
}

/// Format seconds as `MM:SS`.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_timer() -> PomodoroTimer {
        PomodoroTimer::new(SessionDurations {
            work_secs: 3,
            short_break_secs: 2,
            long_break_secs: 5,
            sessions_until_long_break: 2,
        })
    }

    /// Tick once per second until the session finishes.
    fn run_out(timer: &mut PomodoroTimer, mut now: u64) -> u64 {
        while timer.is_running() {
            now += 1000;
            timer.tick(now);
        }
        now
    }

    #[test]
    fn start_pause_resume() {
        let mut timer = PomodoroTimer::default();
        assert_eq!(timer.state(), PomodoroState::Idle);

        assert!(timer.start_work(0).is_some());
        assert_eq!(timer.state(), PomodoroState::Work);
        assert_eq!(timer.remaining_secs(), 1500);

        assert!(timer.pause(10).is_some());
        assert_eq!(timer.state(), PomodoroState::Paused);
        assert_eq!(timer.paused_source(), Some(PomodoroState::Work));

        assert!(timer.resume(20).is_some());
        assert_eq!(timer.state(), PomodoroState::Work);
        assert_eq!(timer.paused_source(), None);
    }

    #[test]
    fn start_requires_idle() {
        let mut timer = PomodoroTimer::default();
        timer.start_work(0);
        assert!(timer.start_work(5).is_none());
        assert!(timer.start_break(5).is_none());
        timer.pause(6);
        assert!(timer.start_work(7).is_none());
    }

    #[test]
    fn pause_and_resume_are_noops_in_wrong_state() {
        let mut timer = PomodoroTimer::default();
        assert!(timer.pause(0).is_none());
        assert!(timer.resume(0).is_none());
        timer.start_work(0);
        assert!(timer.resume(1).is_none());
        timer.pause(2);
        assert!(timer.pause(3).is_none());
        assert_eq!(timer.paused_source(), Some(PomodoroState::Work));
    }

    #[test]
    fn resume_restores_break_state() {
        let mut timer = PomodoroTimer::default();
        timer.start_break(0);
        assert_eq!(timer.state(), PomodoroState::ShortBreak);
        timer.pause(100);
        timer.resume(200);
        assert_eq!(timer.state(), PomodoroState::ShortBreak);
        assert_eq!(timer.resume_fallbacks(), 0);
    }

    #[test]
    fn paused_time_does_not_count() {
        let mut timer = short_timer();
        timer.start_work(0);
        timer.tick(1_000);
        assert_eq!(timer.remaining_secs(), 2);
        timer.pause(1_500);
        timer.tick(60_000);
        assert_eq!(timer.remaining_secs(), 2);
        timer.resume(60_000);
        timer.tick(60_999);
        assert_eq!(timer.remaining_secs(), 2);
        timer.tick(61_000);
        assert_eq!(timer.remaining_secs(), 1);
    }

    #[test]
    fn sub_second_ticks_decrement_once_per_second() {
        let mut timer = PomodoroTimer::default();
        timer.start_work(0);
        for now in (10..1000).step_by(10) {
            timer.tick(now);
        }
        assert_eq!(timer.remaining_secs(), 1500);
        timer.tick(1000);
        assert_eq!(timer.remaining_secs(), 1499);
        timer.tick(1990);
        assert_eq!(timer.remaining_secs(), 1499);
        timer.tick(2000);
        assert_eq!(timer.remaining_secs(), 1498);
    }

    #[test]
    fn remainder_carries_between_ticks() {
        let mut timer = PomodoroTimer::default();
        timer.start_work(0);
        timer.tick(1_700);
        assert_eq!(timer.remaining_secs(), 1499);
        // Anchor moved to 1000, not 1700.
        timer.tick(2_000);
        assert_eq!(timer.remaining_secs(), 1498);
    }

    #[test]
    fn late_tick_catches_up_whole_seconds() {
        let mut timer = PomodoroTimer::default();
        timer.start_work(0);
        timer.tick(5_400);
        assert_eq!(timer.remaining_secs(), 1495);
    }

    #[test]
    fn work_completion_counts_session_and_goes_idle() {
        let mut timer = short_timer();
        timer.start_work(0);
        let event = (1..=3).filter_map(|s| timer.tick(s * 1000)).last();
        assert!(matches!(
            event,
            Some(Event::TimerCompleted {
                state: PomodoroState::Work,
                completed_work_sessions: 1,
                ..
            })
        ));
        assert_eq!(timer.state(), PomodoroState::Idle);
        assert_eq!(timer.completed_work_sessions(), 1);
        assert!(timer.consume_finished());
        assert!(!timer.consume_finished());
    }

    #[test]
    fn break_completion_counts_nothing() {
        let mut timer = short_timer();
        timer.start_break(0);
        run_out(&mut timer, 0);
        assert_eq!(timer.completed_work_sessions(), 0);
        assert_eq!(timer.state(), PomodoroState::Idle);
        assert!(timer.consume_finished());
    }

    #[test]
    fn long_break_after_configured_sessions() {
        let mut timer = short_timer();
        let mut now = 0;
        timer.start_work(now);
        now = run_out(&mut timer, now);
        timer.start_break(now);
        assert_eq!(timer.state(), PomodoroState::ShortBreak);
        now = run_out(&mut timer, now);
        timer.start_work(now);
        now = run_out(&mut timer, now);
        assert_eq!(timer.completed_work_sessions(), 2);
        timer.start_break(now);
        assert_eq!(timer.state(), PomodoroState::LongBreak);
        assert_eq!(timer.remaining_secs(), 5);
    }

    #[test]
    fn reset_clears_counter_but_keeps_durations() {
        let mut timer = short_timer();
        timer.set_work_duration(120).unwrap();
        timer.start_work(0);
        timer.set_remaining(1, 0);
        timer.tick(1_000);
        assert_eq!(timer.completed_work_sessions(), 1);
        timer.start_work(1_000);
        timer.pause(1_500);
        timer.reset(2_000);
        assert_eq!(timer.state(), PomodoroState::Idle);
        assert_eq!(timer.remaining_secs(), 0);
        assert_eq!(timer.completed_work_sessions(), 0);
        assert_eq!(timer.paused_source(), None);
        assert_eq!(timer.work_duration_secs(), 120);
    }

    #[test]
    fn zero_duration_setters_keep_previous_value() {
        let mut timer = PomodoroTimer::default();
        assert!(timer.set_work_duration(0).is_err());
        assert!(timer.set_short_break_duration(0).is_err());
        assert!(timer.set_long_break_duration(0).is_err());
        assert_eq!(timer.work_duration_secs(), 1500);
        assert_eq!(timer.short_break_duration_secs(), 300);
        assert_eq!(timer.long_break_duration_secs(), 900);
    }

    #[test]
    fn resume_without_source_falls_back_to_work() {
        // Only reachable through a broken snapshot.
        let json = r#"{
            "durations": {},
            "state": "paused",
            "remaining_secs": 30,
            "completed_work_sessions": 0
        }"#;
        let mut timer: PomodoroTimer = serde_json::from_str(json).unwrap();
        assert_eq!(timer.state(), PomodoroState::Paused);
        timer.resume(0);
        assert_eq!(timer.state(), PomodoroState::Work);
        assert_eq!(timer.resume_fallbacks(), 1);
    }

    #[test]
    fn snapshot_roundtrip_keeps_pause_source() {
        let mut timer = PomodoroTimer::default();
        timer.start_break(0);
        timer.pause(500);
        let json = serde_json::to_string(&timer).unwrap();
        let mut restored: PomodoroTimer = serde_json::from_str(&json).unwrap();
        restored.resume(1_000);
        assert_eq!(restored.state(), PomodoroState::ShortBreak);
        assert_eq!(restored.resume_fallbacks(), 0);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(61), "01:01");
    }

    #[test]
    fn state_labels() {
        assert_eq!(PomodoroState::ShortBreak.label(), "Short Break");
        let timer = PomodoroTimer::default();
        assert_eq!(timer.state_label(), "Idle");
    }
}
