//! Presence detection from periodic distance samples.
//!
//! The monitor keeps the last three readings of the ranging sensor and compares
//! their mean against the baseline captured when the work session started. Any
//! missing echo makes the comparison fail, so a dead sensor reads as "away" and
//! the timer pauses instead of running unattended.

use serde::{Deserialize, Serialize};

use crate::devices::PresenceSensor;

/// Number of samples per evaluation window.
pub const WINDOW_LEN: usize = 3;

/// Raw reading the sensor driver reports when no echo came back.
pub const NO_ECHO_CM: f32 = -1.0;

/// Default allowed deviation of the window mean from the baseline.
pub const DEFAULT_RANGE_THRESHOLD_CM: f32 = 25.0;

/// One ranging result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    Cm(f32),
    #[default]
    NoEcho,
}

impl Distance {
    /// Map a raw driver reading; negative or non-finite values mean no echo.
    pub fn from_raw_cm(raw: f32) -> Self {
        if raw.is_finite() && raw >= 0.0 {
            Distance::Cm(raw)
        } else {
            Distance::NoEcho
        }
    }

    pub fn cm(self) -> Option<f32> {
        match self {
            Distance::Cm(cm) => Some(cm),
            Distance::NoEcho => None,
        }
    }

    /// Raw representation with the `-1` sentinel.
    pub fn as_raw_cm(self) -> f32 {
        self.cm().unwrap_or(NO_ECHO_CM)
    }
}

/// Ring of the most recent samples plus the session baseline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceWindow {
    samples: [Distance; WINDOW_LEN],
    initial: Distance,
    count: u32,
}

impl PresenceWindow {
    pub fn samples(&self) -> &[Distance; WINDOW_LEN] {
        &self.samples
    }

    pub fn initial_distance(&self) -> Distance {
        self.initial
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Rolling presence policy feeding the auto-pause/resume decision.
#[derive(Debug, Clone)]
pub struct PresenceMonitor {
    window: PresenceWindow,
    range_threshold_cm: f32,
}

impl PresenceMonitor {
    pub fn new(range_threshold_cm: f32) -> Self {
        Self {
            window: PresenceWindow::default(),
            range_threshold_cm,
        }
    }

    pub fn window(&self) -> &PresenceWindow {
        &self.window
    }

    pub fn range_threshold_cm(&self) -> f32 {
        self.range_threshold_cm
    }

    /// Store the reference distance for the current work session.
    pub fn record_baseline(&mut self, sample: Distance) {
        tracing::debug!(baseline = sample.as_raw_cm(), "presence baseline recorded");
        self.window.initial = sample;
    }

    /// Start a fresh window; stale samples are overwritten before the next evaluation.
    pub fn restart(&mut self) {
        self.window.count = 0;
    }

    /// Take one reading from the sensor into the rotating slot.
    pub fn sample(&mut self, sensor: &mut dyn PresenceSensor) -> Distance {
        let reading = sensor.sample_once();
        self.push(reading);
        reading
    }

    /// Store an already-taken reading into the rotating slot.
    pub fn push(&mut self, reading: Distance) {
        let slot = self.window.count as usize % WINDOW_LEN;
        self.window.samples[slot] = reading;
        self.window.count = self.window.count.wrapping_add(1);
        tracing::debug!(
            sample = self.window.count,
            distance = reading.as_raw_cm(),
            "presence sample"
        );
    }

    /// A full batch of samples has accumulated since the last evaluation.
    pub fn window_ready(&self) -> bool {
        self.window.count > 0 && self.window.count as usize % WINDOW_LEN == 0
    }

    /// Mean of the window, if every sample has an echo.
    pub fn average(&self) -> Option<f32> {
        let mut sum = 0.0;
        for sample in &self.window.samples {
            sum += sample.cm()?;
        }
        Some(sum / WINDOW_LEN as f32)
    }

    pub fn is_within_range(&self) -> bool {
        let Some(initial) = self.window.initial.cm() else {
            return false;
        };
        let Some(mean) = self.average() else {
            return false;
        };
        (mean - initial).abs() <= self.range_threshold_cm
    }

    /// When a window is ready, compare it and roll the counter back to zero.
    pub fn evaluate(&mut self) -> Option<bool> {
        if !self.window_ready() {
            return None;
        }
        let within = self.is_within_range();
        tracing::debug!(
            average = ?self.average(),
            initial = self.window.initial.as_raw_cm(),
            within,
            "presence window evaluated"
        );
        self.window.count = 0;
        Some(within)
    }
}

impl Default for PresenceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_RANGE_THRESHOLD_CM)
    }
}
