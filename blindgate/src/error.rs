//! Crate error type.
//!
//! Implausible telemetry is deliberately absent here: dropping a bad report
//! is normal operation and is expressed as [`crate::cover::Verdict`], not
//! as an error.

use thiserror::Error;

use crate::cover::Property;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid position: {0:?}")]
    InvalidPosition(String),

    #[error("payload has no `{0}` field")]
    MissingField(&'static str),

    #[error("property {0} is read-only")]
    NotWritable(Property),
}

pub type Result<T> = std::result::Result<T, Error>;
