//! Where the cover is, where it was told to go, and whether it is
//! believed to be moving.

use tokio::time::Instant;

use crate::types::{Direction, Position};

/// A commanded move believed to be in flight.
///
/// The direction lives inside the movement so there can never be a
/// direction without a start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    pub started: Instant,
    /// `None` when the cover was already at the target, or its position
    /// was unknown, at commit time.
    pub direction: Option<Direction>,
}

/// What happened to the tracker when a sensed position was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensed {
    /// Nothing commanded is in flight; the position was adopted as the new
    /// target (someone moved the cover without us).
    External,
    /// The commanded move reached its target; the cover is now idle.
    Arrived,
    /// Still on the way.
    Moving,
}

#[derive(Debug, Clone, Default)]
pub struct MotionState {
    current: Option<Position>,
    target: Option<Position>,
    movement: Option<Movement>,
    pending_readback: bool,
}

impl MotionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Position> {
        self.current
    }

    pub fn target(&self) -> Option<Position> {
        self.target
    }

    pub fn movement(&self) -> Option<Movement> {
        self.movement
    }

    pub fn is_moving(&self) -> bool {
        self.movement.is_some()
    }

    pub fn has_pending_readback(&self) -> bool {
        self.pending_readback
    }

    /// Apply an accepted position report.
    pub fn record_sensed(&mut self, position: Position) -> Sensed {
        self.current = Some(position);

        match (self.target, self.movement) {
            (Some(target), Some(_)) if target == position => {
                self.movement = None;
                Sensed::Arrived
            }
            (Some(_), Some(_)) => Sensed::Moving,
            _ => {
                self.target = Some(position);
                self.pending_readback = true;
                Sensed::External
            }
        }
    }

    /// Apply a committed target and start tracking the move toward it.
    ///
    /// The direction is recomputed on every commit, so a reversal issued
    /// mid-move is validated against the new direction.
    pub fn commit_target(&mut self, target: Position, now: Instant) -> Movement {
        let movement = Movement {
            started: now,
            direction: self
                .current
                .and_then(|current| Direction::between(current, target)),
        };

        self.target = Some(target);
        self.movement = Some(movement);
        self.pending_readback = true;

        movement
    }

    /// Consume the read-back flag, returning the target once per commit.
    pub fn take_readback(&mut self) -> Option<Position> {
        if !self.pending_readback {
            return None;
        }
        self.pending_readback = false;
        self.target
    }
}
