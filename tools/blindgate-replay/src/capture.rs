//! Capture file parsing.
//!
//! A capture is a CSV file with a header row:
//!
//! ```text
//! time_ms,source,payload
//! 0,device,"{""position"":50,""battery"":90}"
//! 1200,controller,80
//! ```
//!
//! `device` rows carry a cover state message; `controller` rows carry a
//! raw target-position write. Lines starting with `#` are comments.

use std::io;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Which side of the bridge a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Device,
    Controller,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaptureRow {
    pub time_ms: u64,
    pub source: Source,
    pub payload: String,
}

/// Read all rows, ordered by time. Rows sharing a timestamp keep file
/// order.
pub fn read_capture<R: io::Read>(reader: R) -> Result<Vec<CaptureRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize().enumerate() {
        let row: CaptureRow = record.with_context(|| format!("capture row {}", index + 1))?;
        rows.push(row);
    }

    rows.sort_by_key(|row| row.time_ms);
    Ok(rows)
}
