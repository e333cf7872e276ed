mod controller;
mod debounce;
mod engine;
mod filter;
mod motion;
mod property;
mod recent;
mod telemetry;

pub use controller::{CoverController, CoverEvent};
pub use debounce::{DEFAULT_TARGET_CONSOLIDATE, FIRE_TOLERANCE, Request, TargetDebouncer};
pub use engine::{CoverEngine, DeviceCommand, Notification, StateReport};
pub use filter::{PlausibilityFilter, Rejection, Verdict};
pub use motion::{MotionState, Movement, Sensed};
pub use property::Property;
pub use recent::{RECENT_TARGET_RETENTION, RecentTargets};
pub use telemetry::Telemetry;
