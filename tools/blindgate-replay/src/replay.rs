//! Drives a [`CoverEngine`] through a capture on a synthetic clock.

use std::time::Duration;

use blindgate::config::CoverConfig;
use blindgate::cover::{CoverEngine, Notification, Property, Request};
use tokio::time::Instant;

use crate::capture::{CaptureRow, Source};

/// What the engine did at one point in the capture.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Forwarded to the controller.
    Notified(Notification),
    /// A position report the engine dropped as implausible.
    Suppressed { position: u8 },
    /// A target write held for its quiet period.
    Armed { value: String, due_ms: u64 },
    /// A target write equal to the committed target.
    Unchanged { value: String },
    /// A target sent to the device.
    Committed { topic: String, payload: String },
    /// A row the engine couldn't use.
    Invalid { source: Source, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub time_ms: u64,
    pub outcome: Outcome,
}

/// Totals over a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub notified: usize,
    pub suppressed: usize,
    pub writes: usize,
    pub commits: usize,
    pub invalid: usize,
}

impl Summary {
    pub fn of(steps: &[Step]) -> Self {
        let mut summary = Self::default();
        for step in steps {
            match step.outcome {
                Outcome::Notified(_) => summary.notified += 1,
                Outcome::Suppressed { .. } => summary.suppressed += 1,
                Outcome::Armed { .. } | Outcome::Unchanged { .. } => summary.writes += 1,
                Outcome::Committed { .. } => summary.commits += 1,
                Outcome::Invalid { .. } => summary.invalid += 1,
            }
        }
        summary
    }
}

pub struct Replay {
    engine: CoverEngine,
    epoch: Instant,
    steps: Vec<Step>,
}

impl Replay {
    pub fn new(config: &CoverConfig) -> Self {
        Self {
            engine: CoverEngine::new(config),
            epoch: Instant::now(),
            steps: Vec::new(),
        }
    }

    /// Replay `rows` (already time-ordered) and return every step.
    ///
    /// A debounce deadline that falls due at or before a row's timestamp
    /// fires first, at its deadline. Anything still pending after the last
    /// row is committed at its deadline.
    pub fn run(mut self, rows: &[CaptureRow]) -> Vec<Step> {
        for row in rows {
            self.commit_until(row.time_ms);
            self.apply(row);
        }
        self.commit_until(u64::MAX);
        self.steps
    }

    fn at(&self, time_ms: u64) -> Instant {
        self.epoch + Duration::from_millis(time_ms)
    }

    fn elapsed_ms(&self, instant: Instant) -> u64 {
        instant.saturating_duration_since(self.epoch).as_millis() as u64
    }

    fn push(&mut self, time_ms: u64, outcome: Outcome) {
        self.steps.push(Step { time_ms, outcome });
    }

    fn commit_until(&mut self, limit_ms: u64) {
        while let Some(deadline) = self.engine.next_deadline() {
            let due_ms = self.elapsed_ms(deadline);
            if due_ms > limit_ms {
                break;
            }
            let Some(command) = self.engine.poll_commit(deadline) else {
                break;
            };
            self.push(
                due_ms,
                Outcome::Committed {
                    topic: command.topic,
                    payload: command.payload,
                },
            );
        }
    }

    fn apply(&mut self, row: &CaptureRow) {
        let now = self.at(row.time_ms);

        match row.source {
            Source::Device => self.apply_device(row, now),
            Source::Controller => self.apply_controller(row, now),
        }
    }

    fn apply_device(&mut self, row: &CaptureRow, now: Instant) {
        let report = match self
            .engine
            .decode_report(&row.payload, &Property::STATE_ORDER, now)
        {
            Ok(report) => report,
            Err(e) => {
                let error = e.to_string();
                self.push(
                    row.time_ms,
                    Outcome::Invalid {
                        source: row.source,
                        error,
                    },
                );
                return;
            }
        };

        if let Some((position, _)) = report.dropped {
            self.push(
                row.time_ms,
                Outcome::Suppressed {
                    position: position.percent(),
                },
            );
        }

        for notification in report.notifications {
            self.push(row.time_ms, Outcome::Notified(notification));
        }
    }

    fn apply_controller(&mut self, row: &CaptureRow, now: Instant) {
        let value = row.payload.clone();

        let outcome = match self.engine.encode(&row.payload, Property::TargetPosition, now) {
            Ok(Request::Armed { deadline }) => Outcome::Armed {
                value,
                due_ms: self.elapsed_ms(deadline),
            },
            Ok(Request::Unchanged) => Outcome::Unchanged { value },
            Err(e) => Outcome::Invalid {
                source: row.source,
                error: e.to_string(),
            },
        };

        self.push(row.time_ms, outcome);
    }
}
