//! Telemetry filter and target debouncer for Zigbee window coverings.
//!
//! The device side of a Zigbee2MQTT blind is noisy: it echoes just-sent
//! targets back as if they were sensed positions, and a slider drag on the
//! controller side produces a burst of target writes. This crate sits in
//! between, dropping implausible position reports and collapsing target
//! bursts into one committed command.
//!
//! The synchronous core lives in [`cover::CoverEngine`]. The
//! [`cover::CoverController`] actor drives it from Tokio channels, and
//! [`bridge`] speaks a JSON-lines protocol with the host that owns the
//! broker connection.

pub mod bridge;
pub mod config;
pub mod cover;
pub mod error;
pub mod tracing;
pub mod types;
