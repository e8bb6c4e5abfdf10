use serde::{Deserialize, Serialize};

use crate::timer::PomodoroState;

/// Every timer lifecycle change produces an Event.
/// The controller logs them; the simulator prints them next to the directives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        state: PomodoroState,
        duration_secs: u64,
        at_ms: u64,
    },
    TimerPaused {
        /// State that was interrupted and will be restored on resume.
        source: PomodoroState,
        remaining_secs: u64,
        at_ms: u64,
    },
    TimerResumed {
        state: PomodoroState,
        remaining_secs: u64,
        at_ms: u64,
    },
    TimerCompleted {
        /// The session kind that ran out.
        state: PomodoroState,
        completed_work_sessions: u32,
        at_ms: u64,
    },
    TimerReset {
        at_ms: u64,
    },
}

impl Event {
    pub fn at_ms(&self) -> u64 {
        match self {
            Event::TimerStarted { at_ms, .. }
            | Event::TimerPaused { at_ms, .. }
            | Event::TimerResumed { at_ms, .. }
            | Event::TimerCompleted { at_ms, .. }
            | Event::TimerReset { at_ms } => *at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::TimerPaused {
            source: PomodoroState::Work,
            remaining_secs: 42,
            at_ms: 1_000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TimerPaused");
        assert_eq!(json["source"], "work");
        assert_eq!(event.at_ms(), 1_000);
    }
}
