//! Per-cover configuration.
//!
//! Read from the same JSON accessory block the host already keeps for the
//! cover, so keys are camelCase:
//!
//! ```json
//! {
//!   "name": "Office Blind",
//!   "topicBase": "zigbee2mqtt/office_blind",
//!   "maxRate": 4,
//!   "targetConsolidate": 500
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cover::{DEFAULT_TARGET_CONSOLIDATE, Property};
use crate::error::{Error, Result};

const DEFAULT_NAME: &str = "Blind";

/// Fastest plausible travel rate (%/s) for an IKEA roller blind.
const DEFAULT_MAX_RATE: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverConfig {
    /// Human-readable name, used in log fields.
    #[serde(default = "default_name")]
    pub name: String,

    /// Zigbee2MQTT topic the cover publishes its state on.
    pub topic_base: String,

    /// Fastest plausible travel rate in percent per second. Zero or
    /// negative disables the rate check.
    #[serde(default = "default_max_rate")]
    pub max_rate: f64,

    /// Quiet period (ms) before a target write is committed. Zero selects
    /// the default.
    #[serde(default, rename = "targetConsolidate")]
    pub target_consolidate_ms: u64,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_max_rate() -> f64 {
    DEFAULT_MAX_RATE
}

impl CoverConfig {
    pub fn new(topic_base: impl Into<String>) -> Self {
        Self {
            name: default_name(),
            topic_base: topic_base.into(),
            max_rate: DEFAULT_MAX_RATE,
            target_consolidate_ms: 0,
        }
    }

    /// Parse and validate a JSON accessory block.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic_base.trim().is_empty() {
            return Err(Error::Config("topicBase must not be empty".into()));
        }
        if self.topic_base.ends_with('/') {
            return Err(Error::Config(format!(
                "topicBase must not end with '/': {}",
                self.topic_base
            )));
        }
        if !self.max_rate.is_finite() {
            return Err(Error::Config(format!(
                "maxRate must be a finite number, got {}",
                self.max_rate
            )));
        }
        Ok(())
    }

    /// Rate limit for the plausibility filter, `None` when disabled.
    pub fn max_rate(&self) -> Option<f64> {
        (self.max_rate > 0.0).then_some(self.max_rate)
    }

    pub fn target_consolidate(&self) -> Duration {
        match self.target_consolidate_ms {
            0 => DEFAULT_TARGET_CONSOLIDATE,
            ms => Duration::from_millis(ms),
        }
    }

    pub fn topics(&self) -> Topics {
        Topics::new(&self.topic_base)
    }
}

/// Topics derived from the base topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Device state: position, battery, and the rest.
    pub state: String,
    /// Where committed targets are published.
    pub set_position: String,
    /// Where a position refresh is requested.
    pub get_position: String,
}

impl Topics {
    pub fn new(base: &str) -> Self {
        Self {
            state: base.to_string(),
            set_position: format!("{base}/set/position"),
            get_position: format!("{base}/get/position"),
        }
    }

    /// Properties decoded from a message on `topic`, in decode order.
    pub fn properties_for(&self, topic: &str) -> &'static [Property] {
        if topic == self.state {
            &Property::STATE_ORDER
        } else {
            &[]
        }
    }
}
