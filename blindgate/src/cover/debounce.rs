//! Trailing-edge debounce for target-position writes.
//!
//! Dragging a slider on the controller produces a burst of target writes,
//! several per second. Sending each one to the motor makes it lurch back
//! and forth, so writes are held until the controller has been quiet for
//! the consolidation period and only the last one is committed.
//!
//! # State Machine
//!
//! ```text
//!            request(p != committed)
//!  Idle ─────────────────────────────► Armed(p, t)
//!   ▲                                   │  ▲   │
//!   │   request(p == committed)         │  └───┘ request(p' != committed)
//!   ├───────────────────────────────────┤        re-arms with (p', now)
//!   │   fire(), quiet period elapsed    │
//!   └───────────────────────────────────┘  → commit p
//! ```
//!
//! Re-arming replaces the candidate, so the timer for the previous one is
//! cancelled rather than left to fire. [`TargetDebouncer::fire`] still
//! checks that the quiet period really elapsed since the *current*
//! candidate was armed, so a late or coalesced timer can never commit
//! early.

use std::time::Duration;

use tokio::time::Instant;

use crate::types::Position;

/// Default quiet period before a target write is committed.
pub const DEFAULT_TARGET_CONSOLIDATE: Duration = Duration::from_millis(500);

/// Slack allowed when a timer fires slightly before its deadline.
pub const FIRE_TOLERANCE: Duration = Duration::from_millis(5);

/// Result of [`TargetDebouncer::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Value equals the committed target. Nothing is scheduled, and any
    /// outstanding candidate is dropped.
    Unchanged,
    /// Candidate (re-)armed; it commits at `deadline` unless superseded.
    Armed { deadline: Instant },
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    value: Position,
    armed_at: Instant,
}

#[derive(Debug, Clone)]
pub struct TargetDebouncer {
    quiet: Duration,
    candidate: Option<Candidate>,
}

impl TargetDebouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            candidate: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Offer a target write.
    ///
    /// `committed` is the target currently tracked for the cover. A write
    /// equal to it cancels any candidate: the controller's latest intent
    /// is already what the motor was told.
    pub fn request(
        &mut self,
        value: Position,
        committed: Option<Position>,
        now: Instant,
    ) -> Request {
        if committed == Some(value) {
            self.candidate = None;
            return Request::Unchanged;
        }

        self.candidate = Some(Candidate {
            value,
            armed_at: now,
        });

        Request::Armed {
            deadline: now + self.quiet,
        }
    }

    /// Value waiting to be committed, if any.
    pub fn candidate(&self) -> Option<Position> {
        self.candidate.map(|c| c.value)
    }

    /// When the outstanding candidate is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.candidate.map(|c| c.armed_at + self.quiet)
    }

    /// Timer callback. Returns the value to commit, or `None` if there is
    /// no candidate or the quiet period hasn't elapsed for it yet.
    pub fn fire(&mut self, now: Instant) -> Option<Position> {
        let candidate = self.candidate?;

        let waited = now.saturating_duration_since(candidate.armed_at);
        if waited < self.quiet.saturating_sub(FIRE_TOLERANCE) {
            return None;
        }

        self.candidate = None;
        Some(candidate.value)
    }
}

impl Default for TargetDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_CONSOLIDATE)
    }
}
