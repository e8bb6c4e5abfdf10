use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Session lengths and the long-break cadence.
///
/// Durations live for the whole power-on session: they survive `reset()` of the
/// timer and are only changed through the settings screen or configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDurations {
    #[serde(default = "default_work_secs")]
    pub work_secs: u64,
    #[serde(default = "default_short_break_secs")]
    pub short_break_secs: u64,
    #[serde(default = "default_long_break_secs")]
    pub long_break_secs: u64,
    /// Every n-th completed work session earns a long break.
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
}

fn default_work_secs() -> u64 {
    1500
}
fn default_short_break_secs() -> u64 {
    300
}
fn default_long_break_secs() -> u64 {
    900
}
fn default_sessions_until_long_break() -> u32 {
    4
}

impl Default for SessionDurations {
    fn default() -> Self {
        Self {
            work_secs: default_work_secs(),
            short_break_secs: default_short_break_secs(),
            long_break_secs: default_long_break_secs(),
            sessions_until_long_break: default_sessions_until_long_break(),
        }
    }
}

impl SessionDurations {
    /// Check that every duration is at least one second and the cadence is positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_nonzero("work_secs", self.work_secs)?;
        ensure_nonzero("short_break_secs", self.short_break_secs)?;
        ensure_nonzero("long_break_secs", self.long_break_secs)?;
        if self.sessions_until_long_break == 0 {
            return Err(ValidationError::InvalidValue {
                field: "sessions_until_long_break".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Whether a break started after `completed` work sessions should be long.
    pub fn is_long_break_due(&self, completed: u32) -> bool {
        completed > 0
            && self.sessions_until_long_break > 0
            && completed % self.sessions_until_long_break == 0
    }
}

pub(crate) fn ensure_nonzero(field: &str, secs: u64) -> Result<(), ValidationError> {
    if secs == 0 {
        return Err(ValidationError::ZeroDuration {
            field: field.to_string(),
        });
    }
    Ok(())
}
