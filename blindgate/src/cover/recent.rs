use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::types::Position;

/// How long a committed target counts as "recently commanded by us".
pub const RECENT_TARGET_RETENTION: Duration = Duration::from_secs(5);

/// Targets this engine committed within the retention window.
///
/// Only ever used as a membership test: a position report that matches one
/// of these values may be the device echoing our own command back rather
/// than a sensed position. Stale entries are evicted lazily.
#[derive(Debug, Clone)]
pub struct RecentTargets {
    retention: Duration,
    entries: HashMap<Position, Instant>,
}

impl Default for RecentTargets {
    fn default() -> Self {
        Self::new(RECENT_TARGET_RETENTION)
    }
}

impl RecentTargets {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            entries: HashMap::new(),
        }
    }

    /// Drop entries older than the retention window.
    pub fn evict(&mut self, now: Instant) {
        let retention = self.retention;
        self.entries
            .retain(|_, committed| now.saturating_duration_since(*committed) <= retention);
    }

    /// Record a commit, replacing any older timestamp for the same value.
    pub fn record(&mut self, position: Position, now: Instant) {
        self.evict(now);
        self.entries.insert(position, now);
    }

    pub fn contains(&self, position: Position) -> bool {
        self.entries.contains_key(&position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(percent: u8) -> Position {
        Position::new(percent).unwrap()
    }

    #[test]
    fn recorded_target_is_member() {
        let now = Instant::now();
        let mut recent = RecentTargets::default();

        recent.record(pos(80), now);

        assert!(recent.contains(pos(80)));
        assert!(!recent.contains(pos(40)));
    }

    #[test]
    fn entries_survive_exactly_the_retention_window() {
        let t0 = Instant::now();
        let mut recent = RecentTargets::default();
        recent.record(pos(80), t0);

        recent.evict(t0 + RECENT_TARGET_RETENTION);
        assert!(recent.contains(pos(80)));

        recent.evict(t0 + RECENT_TARGET_RETENTION + Duration::from_millis(1));
        assert!(!recent.contains(pos(80)));
        assert!(recent.is_empty());
    }

    #[test]
    fn record_evicts_stale_entries() {
        let t0 = Instant::now();
        let mut recent = RecentTargets::default();
        recent.record(pos(10), t0);

        recent.record(pos(20), t0 + Duration::from_secs(6));

        assert_eq!(recent.len(), 1);
        assert!(recent.contains(pos(20)));
    }

    #[test]
    fn recommit_refreshes_timestamp() {
        let t0 = Instant::now();
        let mut recent = RecentTargets::default();
        recent.record(pos(50), t0);
        recent.record(pos(50), t0 + Duration::from_secs(4));

        recent.evict(t0 + Duration::from_secs(8));

        assert!(recent.contains(pos(50)));
    }
}
