//! Red-or-black betting mini-game.
//!
//! A round starts when the device is shaken in the menu screen. The outcome is
//! drawn only when a choice is registered, and a round resolves at most once.

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamblingChoice {
    Red,
    Black,
}

/// One betting round. `awaiting_choice` implies `active`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GamblingRound {
    active: bool,
    awaiting_choice: bool,
}

impl GamblingRound {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn choice_pending(&self) -> bool {
        self.active && self.awaiting_choice
    }

    pub fn start(&mut self) {
        self.active = true;
        self.awaiting_choice = true;
    }

    /// Clear both flags.
    pub fn reset(&mut self) {
        self.active = false;
        self.awaiting_choice = false;
    }
}

/// The round plus the generator deciding outcomes.
#[derive(Debug, Clone)]
pub struct GamblingTable {
    round: GamblingRound,
    rng: Mcg128Xsl64,
}

impl GamblingTable {
    /// Outcomes are reproducible when a seed is given.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self {
            round: GamblingRound::default(),
            rng,
        }
    }

    pub fn round(&self) -> GamblingRound {
        self.round
    }

    pub fn choice_pending(&self) -> bool {
        self.round.choice_pending()
    }

    pub fn start(&mut self) {
        self.round.start();
    }

    pub fn cancel(&mut self) {
        self.round.reset();
    }

    /// Resolve the round with `choice`. Returns `Some(win)` the first time and
    /// `None` when no choice is pending.
    pub fn register_choice(&mut self, choice: GamblingChoice) -> Option<bool> {
        if !self.round.choice_pending() {
            tracing::warn!(?choice, "gambling choice registered without a pending round");
            return None;
        }
        let win = self.rng.gen_bool(0.5);
        self.round.reset();
        tracing::info!(?choice, win, "gambling round resolved");
        Some(win)
    }
}
