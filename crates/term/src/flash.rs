//! Flash timing for matched cells.
//!
//! A new match set restarts the cycle. The cells alternate highlighted and
//! hidden every `FLASH_INTERVAL_MS`, starting highlighted, and draw normally
//! once `FLASH_TOGGLES` toggles have passed.

use std::collections::BTreeSet;
use std::time::Instant;

use crate::types::{CellPos, FLASH_INTERVAL_MS, FLASH_TOGGLES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashPhase {
    /// No flash running; matched cells draw like any other.
    Idle,
    Highlight,
    Hidden,
}

#[derive(Debug, Default)]
pub struct FlashClock {
    cells: BTreeSet<CellPos>,
    started: Option<Instant>,
}

impl FlashClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the latest matched set; a different non-empty set restarts the
    /// cycle at `now`.
    pub fn observe(&mut self, matched: &BTreeSet<CellPos>, now: Instant) {
        if matched.is_empty() {
            self.cells.clear();
            self.started = None;
        } else if *matched != self.cells {
            self.cells = matched.clone();
            self.started = Some(now);
        }
    }

    pub fn phase(&self, now: Instant) -> FlashPhase {
        let Some(started) = self.started else {
            return FlashPhase::Idle;
        };
        let toggles = now.saturating_duration_since(started).as_millis() / FLASH_INTERVAL_MS as u128;
        if toggles >= FLASH_TOGGLES as u128 {
            FlashPhase::Idle
        } else if toggles % 2 == 0 {
            FlashPhase::Highlight
        } else {
            FlashPhase::Hidden
        }
    }

}
