//! Cover position and movement direction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Cover position in percent, 0 (closed) through 100 (open).
///
/// Kept as a newtype so "the device never reported" (`Option::None`) can't
/// be confused with "the device reported fully closed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Position(u8);

impl Position {
    pub const CLOSED: Self = Self(0);
    pub const OPEN: Self = Self(100);

    pub const fn new(percent: u8) -> Option<Self> {
        if percent <= Self::OPEN.0 {
            Some(Self(percent))
        } else {
            None
        }
    }

    pub const fn percent(self) -> u8 {
        self.0
    }

    /// Parse a raw controller write.
    ///
    /// Follows `parseInt` semantics: surrounding whitespace is ignored and
    /// a fractional part is truncated, so `"42.7"` is 42.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let whole = trimmed.split_once('.').map_or(trimmed, |(int, _)| int);
        whole
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| Error::InvalidPosition(raw.to_string()))
    }

    /// Signed distance from `self` to `other`.
    pub fn delta_to(self, other: Position) -> i16 {
        i16::from(other.0) - i16::from(self.0)
    }
}

impl TryFrom<u8> for Position {
    type Error = Error;

    fn try_from(percent: u8) -> Result<Self> {
        Self::new(percent).ok_or_else(|| Error::InvalidPosition(percent.to_string()))
    }
}

impl From<Position> for u8 {
    fn from(position: Position) -> Self {
        position.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a commanded move.
///
/// There is no "stationary" variant; a zero-length move is expressed as
/// `Option::<Direction>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Position increasing.
    Opening,
    /// Position decreasing.
    Closing,
}

impl Direction {
    /// Sign of `delta`, or `None` for zero.
    pub fn of_delta(delta: i16) -> Option<Self> {
        match delta.signum() {
            1 => Some(Direction::Opening),
            -1 => Some(Direction::Closing),
            _ => None,
        }
    }

    /// Direction of travel from `from` to `to`.
    pub fn between(from: Position, to: Position) -> Option<Self> {
        Self::of_delta(from.delta_to(to))
    }
}
