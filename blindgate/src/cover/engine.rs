//! One cover's filtering and debouncing state.

use tokio::time::Instant;

use super::debounce::{Request, TargetDebouncer};
use super::filter::{PlausibilityFilter, Rejection, Verdict};
use super::motion::{MotionState, Sensed};
use super::property::Property;
use super::recent::RecentTargets;
use super::telemetry::Telemetry;
use crate::config::{CoverConfig, Topics};
use crate::error::{Error, Result};
use crate::tracing::prelude::*;
use crate::types::{ChangeGate, Position};

/// Payload asking Zigbee2MQTT to refresh the cover position.
const POSITION_REFRESH_PAYLOAD: &str = "1";

/// Something to publish toward the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommand {
    pub topic: String,
    pub payload: String,
}

/// A value for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub property: Property,
    pub value: u8,
}

/// Result of decoding one state message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateReport {
    /// Values for the controller, in decode order.
    pub notifications: Vec<Notification>,
    /// Position report the plausibility filter dropped.
    pub dropped: Option<(Position, Rejection)>,
}

enum Observed {
    Emit(u8),
    Quiet,
    Dropped { reported: Position, reason: Rejection },
}

impl From<Option<u8>> for Observed {
    fn from(value: Option<u8>) -> Self {
        value.map_or(Observed::Quiet, Observed::Emit)
    }
}

/// Filtering and debouncing state for a single cover.
///
/// Synchronous and clock-agnostic: every call takes `now`, which lets the
/// controller drive it from Tokio time and the replay tool from a capture's
/// timestamps. Never shared; the owner serializes all calls.
#[derive(Debug)]
pub struct CoverEngine {
    name: String,
    topics: Topics,
    motion: MotionState,
    recent: RecentTargets,
    filter: PlausibilityFilter,
    debouncer: TargetDebouncer,
    battery: ChangeGate<u8>,
}

impl CoverEngine {
    pub fn new(config: &CoverConfig) -> Self {
        Self {
            name: config.name.clone(),
            topics: config.topics(),
            motion: MotionState::new(),
            recent: RecentTargets::default(),
            filter: PlausibilityFilter::new(config.max_rate()),
            debouncer: TargetDebouncer::new(config.target_consolidate()),
            battery: ChangeGate::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn motion(&self) -> &MotionState {
        &self.motion
    }

    /// Request for the device's current position, sent once at startup to
    /// seed the tracker.
    pub fn startup_command(&self) -> DeviceCommand {
        DeviceCommand {
            topic: self.topics.get_position.clone(),
            payload: POSITION_REFRESH_PAYLOAD.to_string(),
        }
    }

    /// Decode one property from a device state message.
    ///
    /// `Ok(None)` means nothing should be emitted, which includes the
    /// normal case of an implausible position report being dropped.
    pub fn decode(
        &mut self,
        message: &str,
        property: Property,
        now: Instant,
    ) -> Result<Option<u8>> {
        let telemetry = Telemetry::parse(message)?;
        match self.observe(&telemetry, property, now)? {
            Observed::Emit(value) => Ok(Some(value)),
            Observed::Quiet | Observed::Dropped { .. } => Ok(None),
        }
    }

    /// Decode a state message for every property it carries, in
    /// [`Property::STATE_ORDER`].
    pub fn decode_state(&mut self, message: &str, now: Instant) -> Result<Vec<Notification>> {
        self.decode_properties(message, &Property::STATE_ORDER, now)
    }

    /// Decode a message for each of `properties` in order.
    pub fn decode_properties(
        &mut self,
        message: &str,
        properties: &[Property],
        now: Instant,
    ) -> Result<Vec<Notification>> {
        Ok(self.decode_report(message, properties, now)?.notifications)
    }

    /// Like [`decode_properties`](Self::decode_properties), but also says
    /// which position report, if any, the filter dropped.
    ///
    /// A property missing from the payload is skipped. An out-of-range
    /// position is skipped with a warning; the other properties of the
    /// message still go through.
    pub fn decode_report(
        &mut self,
        message: &str,
        properties: &[Property],
        now: Instant,
    ) -> Result<StateReport> {
        let telemetry = Telemetry::parse(message)?;
        let mut report = StateReport::default();

        for &property in properties {
            match self.observe(&telemetry, property, now) {
                Ok(Observed::Emit(value)) => {
                    report.notifications.push(Notification { property, value });
                }
                Ok(Observed::Quiet) => {}
                Ok(Observed::Dropped { reported, reason }) => {
                    report.dropped = Some((reported, reason));
                }
                Err(Error::MissingField(field)) => {
                    trace!(cover = %self.name, %property, field, "Field absent from state message");
                }
                Err(Error::InvalidPosition(raw)) => {
                    warn!(cover = %self.name, %property, raw = %raw, "Position out of range");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    fn observe(
        &mut self,
        telemetry: &Telemetry,
        property: Property,
        now: Instant,
    ) -> Result<Observed> {
        let observed: Observed = match property {
            Property::CurrentPosition => {
                let reported = telemetry.position()?;
                match self.report_position(reported, now) {
                    Verdict::Accept => Some(reported.percent()).into(),
                    Verdict::Reject(reason) => Observed::Dropped { reported, reason },
                }
            }
            Property::TargetPosition => self.read_target().map(Position::percent).into(),
            Property::BatteryLevel => self.report_battery(telemetry.battery()?).into(),
        };
        Ok(observed)
    }

    /// Run a sensed position through the plausibility filter and, if it
    /// passes, apply it to the tracker.
    pub fn report_position(&mut self, reported: Position, now: Instant) -> Verdict {
        let verdict = self
            .filter
            .check(reported, &self.motion, &mut self.recent, now);

        match verdict {
            Verdict::Reject(reason) => {
                debug!(
                    cover = %self.name,
                    reported = %reported,
                    current = ?self.motion.current().map(Position::percent),
                    %reason,
                    "Dropping implausible position report"
                );
            }
            Verdict::Accept => match self.motion.record_sensed(reported) {
                Sensed::External => {
                    debug!(
                        cover = %self.name,
                        position = %reported,
                        "Cover moved outside our control"
                    );
                }
                Sensed::Arrived => {
                    debug!(cover = %self.name, position = %reported, "Cover reached target");
                }
                Sensed::Moving => {
                    trace!(cover = %self.name, position = %reported, "Cover moving");
                }
            },
        }

        verdict
    }

    /// Read-after-write for the target: the committed target, once.
    pub fn read_target(&mut self) -> Option<Position> {
        self.motion.take_readback()
    }

    pub fn report_battery(&mut self, level: u8) -> Option<u8> {
        self.battery.offer(level)
    }

    /// Accept a controller write. Only the target position is writable.
    ///
    /// Never emits anything directly; a commit surfaces later through
    /// [`poll_commit`](Self::poll_commit).
    pub fn encode(&mut self, raw: &str, property: Property, now: Instant) -> Result<Request> {
        if !property.is_writable() {
            return Err(Error::NotWritable(property));
        }
        let target = Position::parse(raw)?;
        Ok(self.request_target(target, now))
    }

    pub fn request_target(&mut self, target: Position, now: Instant) -> Request {
        let request = self.debouncer.request(target, self.motion.target(), now);

        match request {
            Request::Unchanged => {
                trace!(cover = %self.name, target = %target, "Target unchanged");
            }
            Request::Armed { .. } => {
                trace!(cover = %self.name, target = %target, "Target write held for quiet period");
            }
        }

        request
    }

    /// Target write waiting out its quiet period.
    pub fn pending_target(&self) -> Option<Position> {
        self.debouncer.candidate()
    }

    /// When [`poll_commit`](Self::poll_commit) next has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Commit the pending target if its quiet period has elapsed.
    pub fn poll_commit(&mut self, now: Instant) -> Option<DeviceCommand> {
        let target = self.debouncer.fire(now)?;

        self.recent.record(target, now);
        let movement = self.motion.commit_target(target, now);

        info!(
            cover = %self.name,
            target = %target,
            from = ?self.motion.current().map(Position::percent),
            direction = ?movement.direction,
            "Committing target position"
        );

        Some(DeviceCommand {
            topic: self.topics.set_position.clone(),
            payload: target.to_string(),
        })
    }
}
