//! # Pomodesk Core Library
//!
//! Control logic for a two-button desk gadget: a pomodoro timer that pauses
//! itself when the user walks away, a shake-triggered canteen menu browser and
//! a red-or-black betting mini-game. Hardware is reached only through the
//! capability traits in [`devices`], so the same controller runs on a board,
//! in tests and in the `pomodesk simulate` command.
//!
//! ## Architecture
//!
//! - **Timer**: countdown state machine driven by a monotonic millisecond clock;
//!   the caller invokes `tick()` every control cycle
//! - **Presence**: rolling three-sample window compared against a per-session
//!   baseline distance
//! - **Gestures**: debounced presses, both-button chords and double-clicks
//! - **Controller**: the mode state machine merging all of the above
//!
//! ## Key Components
//!
//! - [`AppController`]: owns every sub-machine; `tick()` is the loop body
//! - [`PomodoroTimer`]: work/break/pause state machine
//! - [`PresenceMonitor`]: auto-pause/resume policy
//! - [`Config`]: TOML startup configuration

pub mod config;
pub mod controller;
pub mod devices;
pub mod error;
pub mod events;
pub mod gambling;
pub mod gesture;
pub mod menu;
pub mod presence;
pub mod sim;
pub mod timer;

pub use config::Config;
pub use controller::{AppController, AppMode, Effect, InputEvent, Screen, TickReport, Transition};
pub use devices::{Button, Cue, Devices, IdleTab, LightScene, ShakeFlag};
pub use error::{ConfigError, CoreError, ValidationError};
pub use events::Event;
pub use gambling::GamblingChoice;
pub use gesture::{Gesture, GestureDebouncer};
pub use menu::{MenuCursor, MenuItem, MenuProvider, StaticMenu};
pub use presence::{Distance, PresenceMonitor};
pub use timer::{PomodoroState, PomodoroTimer, SessionDurations};
