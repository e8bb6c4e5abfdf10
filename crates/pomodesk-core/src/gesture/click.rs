/// Result of registering one click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// First click; the single-click action is deferred.
    Pending,
    /// Second click inside the window.
    Double,
}

/// Single/double click disambiguation for one button.
#[derive(Debug, Clone)]
pub struct ClickClassifier {
    first_click_ms: Option<u64>,
    window_ms: u64,
}

impl ClickClassifier {
    pub fn new(window_ms: u64) -> Self {
        Self {
            first_click_ms: None,
            window_ms,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.first_click_ms.is_some()
    }

    pub fn register(&mut self, now_ms: u64) -> ClickOutcome {
        match self.first_click_ms {
            Some(first) if now_ms.saturating_sub(first) <= self.window_ms => {
                self.first_click_ms = None;
                ClickOutcome::Double
            }
            _ => {
                self.first_click_ms = Some(now_ms);
                ClickOutcome::Pending
            }
        }
    }

    /// Returns true when a pending click matures into a single click.
    pub fn expire(&mut self, now_ms: u64, eligible: bool) -> bool {
        let Some(first) = self.first_click_ms else {
            return false;
        };
        if eligible && now_ms.saturating_sub(first) <= self.window_ms {
            return false;
        }
        self.first_click_ms = None;
        true
    }

    pub fn cancel(&mut self) {
        self.first_click_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_second_click_starts_new_pending() {
        let mut c = ClickClassifier::new(350);
        assert_eq!(c.register(0), ClickOutcome::Pending);
        assert_eq!(c.register(400), ClickOutcome::Pending);
        assert_eq!(c.register(700), ClickOutcome::Double);
        assert!(!c.is_pending());
    }

    #[test]
    fn cancel_drops_pending_click() {
        let mut c = ClickClassifier::new(350);
        c.register(0);
        c.cancel();
        assert!(!c.expire(1_000, true));
    }
}
