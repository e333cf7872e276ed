use std::fmt;

use tokio::time::Instant;

use super::motion::MotionState;
use super::recent::RecentTargets;
use crate::types::{Direction, Position};

/// Outcome of running a position report through [`PlausibilityFilter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accept,
    Reject(Rejection),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Why a report was judged implausible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// The report moves against the commanded direction.
    WrongDirection { expected: Direction, delta: i16 },
    /// The report implies the cover moved faster than it can.
    ImplausibleRate { rate: f64, max_rate: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::WrongDirection { expected, delta } => {
                write!(f, "moved {delta:+} while {expected:?}")
            }
            Rejection::ImplausibleRate { rate, max_rate } => {
                write!(f, "rate {rate:.1}%/s exceeds {max_rate:.1}%/s")
            }
        }
    }
}

/// Rejects position reports that can't be real motion.
///
/// Zigbee2MQTT echoes a just-sent target back as the current position
/// before the motor has moved. Such a report matches a value we recently
/// committed and shows up either too soon (an impossible rate) or on the
/// wrong side of where the cover was (the wrong direction).
///
/// Reports are only distrusted while a commanded move is in flight *and*
/// the value is one we recently commanded. Anything else, like a
/// physical button press on the blind, passes through.
#[derive(Debug, Clone)]
pub struct PlausibilityFilter {
    max_rate: Option<f64>,
}

impl PlausibilityFilter {
    /// Creates a filter with the fastest plausible travel rate in
    /// percent per second. `None` disables the rate check.
    pub fn new(max_rate: Option<f64>) -> Self {
        Self { max_rate }
    }

    pub fn max_rate(&self) -> Option<f64> {
        self.max_rate
    }

    /// Judges a report against the current motion state.
    ///
    /// Evicts stale recent targets as a side effect; otherwise nothing is
    /// modified. Applying an accepted report is up to the caller.
    pub fn check(
        &self,
        reported: Position,
        motion: &MotionState,
        recent: &mut RecentTargets,
        now: Instant,
    ) -> Verdict {
        recent.evict(now);

        let (Some(movement), Some(current)) = (motion.movement(), motion.current()) else {
            return Verdict::Accept;
        };
        if !recent.contains(reported) {
            return Verdict::Accept;
        }

        let delta = current.delta_to(reported);

        if let (Some(_), Some(expected)) = (motion.target(), movement.direction) {
            if Direction::of_delta(delta).is_some_and(|actual| actual != expected) {
                return Verdict::Reject(Rejection::WrongDirection { expected, delta });
            }
        }

        if let Some(max_rate) = self.max_rate {
            let rate = travel_rate(delta, now.saturating_duration_since(movement.started));
            if rate > max_rate {
                return Verdict::Reject(Rejection::ImplausibleRate { rate, max_rate });
            }
        }

        Verdict::Accept
    }
}

/// Percent per second. Infinite for any movement in zero time.
fn travel_rate(delta: i16, elapsed: std::time::Duration) -> f64 {
    if delta == 0 {
        return 0.0;
    }
    f64::from(delta.unsigned_abs()) / elapsed.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn pos(percent: u8) -> Position {
        Position::new(percent).unwrap()
    }

    /// Cover sensed at `from`, then a move to `to` committed at `t0`.
    fn moving(from: u8, to: u8, t0: Instant) -> (MotionState, RecentTargets) {
        let mut motion = MotionState::new();
        let mut recent = RecentTargets::default();
        motion.record_sensed(pos(from));
        motion.commit_target(pos(to), t0);
        recent.record(pos(to), t0);
        (motion, recent)
    }

    #[test]
    fn should_accept_anything_when_idle() {
        let filter = PlausibilityFilter::new(Some(4.0));
        let mut recent = RecentTargets::default();
        let motion = MotionState::new();

        let verdict = filter.check(pos(30), &motion, &mut recent, Instant::now());

        assert_eq!(verdict, Verdict::Accept);
    }

    #[test]
    fn should_reject_echo_arriving_too_fast() {
        let t0 = Instant::now();
        let filter = PlausibilityFilter::new(Some(4.0));
        let (motion, mut recent) = moving(50, 80, t0);

        let verdict = filter.check(pos(80), &motion, &mut recent, t0 + Duration::from_millis(100));

        match verdict {
            Verdict::Reject(Rejection::ImplausibleRate { rate, max_rate }) => {
                assert!((rate - 300.0).abs() < 1e-6, "rate={rate}");
                assert_eq!(max_rate, 4.0);
            }
            other => panic!("expected rate rejection, got {other:?}"),
        }
    }

    #[test]
    fn should_accept_echo_at_plausible_rate() {
        let t0 = Instant::now();
        let filter = PlausibilityFilter::new(Some(4.0));
        let (motion, mut recent) = moving(70, 80, t0);

        // 10% over 3s is 3.3%/s.
        let verdict = filter.check(pos(80), &motion, &mut recent, t0 + Duration::from_secs(3));

        assert_eq!(verdict, Verdict::Accept);
    }

    #[test]
    fn should_reject_report_against_commanded_direction() {
        let t0 = Instant::now();
        let filter = PlausibilityFilter::new(None);
        let (motion, mut recent) = moving(50, 80, t0);
        recent.record(pos(40), t0);

        let verdict = filter.check(pos(40), &motion, &mut recent, t0 + Duration::from_secs(2));

        assert_eq!(
            verdict,
            Verdict::Reject(Rejection::WrongDirection {
                expected: Direction::Opening,
                delta: -10,
            })
        );
    }

    #[test]
    fn should_check_direction_before_rate() {
        let t0 = Instant::now();
        let filter = PlausibilityFilter::new(Some(4.0));
        let (motion, mut recent) = moving(50, 80, t0);
        recent.record(pos(40), t0);

        let verdict = filter.check(pos(40), &motion, &mut recent, t0 + Duration::from_millis(10));

        assert!(matches!(
            verdict,
            Verdict::Reject(Rejection::WrongDirection { .. })
        ));
    }

    #[test]
    fn should_accept_values_we_never_commanded() {
        let t0 = Instant::now();
        let filter = PlausibilityFilter::new(Some(4.0));
        let (motion, mut recent) = moving(50, 80, t0);

        // A big jump, but not to a value we sent.
        let verdict = filter.check(pos(20), &motion, &mut recent, t0 + Duration::from_millis(10));

        assert_eq!(verdict, Verdict::Accept);
    }

    #[test]
    fn should_trust_again_once_target_expires() {
        let t0 = Instant::now();
        let filter = PlausibilityFilter::new(Some(4.0));
        let (motion, mut recent) = moving(50, 80, t0);

        let verdict = filter.check(pos(80), &motion, &mut recent, t0 + Duration::from_secs(6));

        assert_eq!(verdict, Verdict::Accept);
        assert!(recent.is_empty());
    }

    #[test]
    fn should_skip_rate_check_when_disabled() {
        let t0 = Instant::now();
        let filter = PlausibilityFilter::new(None);
        let (motion, mut recent) = moving(50, 80, t0);

        let verdict = filter.check(pos(80), &motion, &mut recent, t0);

        assert_eq!(verdict, Verdict::Accept);
    }

    #[test]
    fn should_accept_without_known_position() {
        let t0 = Instant::now();
        let filter = PlausibilityFilter::new(Some(4.0));
        let mut motion = MotionState::new();
        let mut recent = RecentTargets::default();
        motion.commit_target(pos(80), t0);
        recent.record(pos(80), t0);

        // Device never reported, so there is nothing to compare against.
        let verdict = filter.check(pos(80), &motion, &mut recent, t0);

        assert_eq!(verdict, Verdict::Accept);
    }

    #[test]
    fn should_accept_zero_delta_at_zero_elapsed() {
        let t0 = Instant::now();
        let filter = PlausibilityFilter::new(Some(4.0));
        let (motion, mut recent) = moving(50, 50, t0);

        let verdict = filter.check(pos(50), &motion, &mut recent, t0);

        assert_eq!(verdict, Verdict::Accept);
    }

    #[test]
    fn travel_rate_is_percent_per_second() {
        assert_eq!(travel_rate(8, Duration::from_secs(2)), 4.0);
        assert_eq!(travel_rate(-8, Duration::from_secs(2)), 4.0);
        assert_eq!(travel_rate(0, Duration::ZERO), 0.0);
        assert!(travel_rate(1, Duration::ZERO).is_infinite());
    }
}
