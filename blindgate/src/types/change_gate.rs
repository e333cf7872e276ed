//! An "emit only if changed" gate.
//!
//! Sits in front of a pass-through value (battery level, for one) so the
//! controller only hears about it when it actually moves:
//!
//! ```text
//! offer:  90    90    85    85    90
//! emit:   90    --    85    --    90
//! ```

/// Remembers the last emitted value and suppresses repeats.
#[derive(Debug, Clone)]
pub struct ChangeGate<T> {
    last: Option<T>,
}

impl<T> Default for ChangeGate<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<T: Copy + PartialEq> ChangeGate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a new reading; returns `Some(value)` when it differs from the
    /// last emitted one (or nothing has been emitted yet).
    pub fn offer(&mut self, value: T) -> Option<T> {
        if self.last == Some(value) {
            return None;
        }
        self.last = Some(value);
        Some(value)
    }

    /// Last emitted value, if any.
    pub fn last(&self) -> Option<T> {
        self.last
    }
}
