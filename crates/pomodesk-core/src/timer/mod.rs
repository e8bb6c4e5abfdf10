mod durations;
mod engine;

pub use durations::SessionDurations;
pub use engine::{format_clock, PomodoroState, PomodoroTimer};
