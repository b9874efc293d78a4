//! Push-to-talk auto-release
//!
//! Triggering a clip opens the engine's gate, and the gate stays open after
//! the clip has played out. The console keeps a single deadline for closing
//! it again. Time is passed in so the deadline can be driven by tests.

use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct GateTimer {
    deadline: Option<Instant>,
}

impl GateTimer {
    /// Release `remaining_secs` after `now`, replacing any earlier deadline
    pub fn schedule(&mut self, now: Instant, remaining_secs: f64) {
        let remaining = if remaining_secs.is_finite() {
            remaining_secs.max(0.0)
        } else {
            0.0
        };
        self.deadline = Some(now + Duration::from_secs_f64(remaining));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once, on the first call at or past the deadline
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
