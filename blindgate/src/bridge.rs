//! JSON-lines bridge to the host that owns the broker connection.
//!
//! One JSON object per line, tagged by `kind`.
//!
//! Host to bridge:
//!
//! ```text
//! {"kind":"message","topic":"zigbee2mqtt/blind","payload":"{\"position\":40}"}
//! {"kind":"write","property":"targetPosition","value":"65"}
//! ```
//!
//! Bridge to host:
//!
//! ```text
//! {"kind":"publish","topic":"zigbee2mqtt/blind/set/position","payload":"65"}
//! {"kind":"notify","property":"currentPosition","value":40}
//! ```
//!
//! `payload` and `value` may be given as JSON values instead of strings;
//! they are converted to their JSON text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cover::{CoverEvent, DeviceCommand, Notification, Property};
use crate::error::Result;
use crate::tracing::prelude::*;

/// A line from the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inbound {
    Message { topic: String, payload: Value },
    Write { property: Property, value: Value },
}

impl From<Inbound> for CoverEvent {
    fn from(line: Inbound) -> Self {
        match line {
            Inbound::Message { topic, payload } => CoverEvent::Message {
                topic,
                payload: into_text(payload),
            },
            Inbound::Write { property, value } => CoverEvent::Write {
                property,
                value: into_text(value),
            },
        }
    }
}

/// A line to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outbound {
    Publish { topic: String, payload: String },
    Notify { property: Property, value: u8 },
}

impl From<DeviceCommand> for Outbound {
    fn from(command: DeviceCommand) -> Self {
        Outbound::Publish {
            topic: command.topic,
            payload: command.payload,
        }
    }
}

impl From<Notification> for Outbound {
    fn from(notification: Notification) -> Self {
        Outbound::Notify {
            property: notification.property,
            value: notification.value,
        }
    }
}

/// Strings pass through unquoted; anything else becomes its JSON text.
fn into_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Moves lines between the host and a [`crate::cover::CoverController`].
pub struct Bridge<R, W> {
    reader: R,
    writer: W,
    event_tx: mpsc::Sender<CoverEvent>,
    notify_rx: mpsc::Receiver<Notification>,
    command_rx: mpsc::Receiver<DeviceCommand>,
}

impl<R, W> Bridge<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        reader: R,
        writer: W,
        event_tx: mpsc::Sender<CoverEvent>,
        notify_rx: mpsc::Receiver<Notification>,
        command_rx: mpsc::Receiver<DeviceCommand>,
    ) -> Self {
        Self {
            reader,
            writer,
            event_tx,
            notify_rx,
            command_rx,
        }
    }

    /// Run until the host closes its input and the controller has nothing
    /// left to say, or until `cancellation` fires.
    ///
    /// Reading and writing run side by side: the reader may wait on a full
    /// event channel while the writer keeps draining the controller's
    /// output. On end of input the event channel is closed and the writer
    /// carries on until the controller drops its senders.
    ///
    /// Returns an error only when the host pipe itself fails.
    pub async fn run(self, cancellation: CancellationToken) -> Result<()> {
        let Self {
            reader,
            writer,
            event_tx,
            notify_rx,
            command_rx,
        } = self;

        tokio::try_join!(
            read_events(reader, event_tx, &cancellation),
            write_outbound(writer, notify_rx, command_rx, &cancellation),
        )?;
        Ok(())
    }
}

/// Forward host lines to the controller until end of input. Dropping
/// `event_tx` on return tells the controller no more events are coming.
async fn read_events<R>(
    reader: R,
    event_tx: mpsc::Sender<CoverEvent>,
    cancellation: &CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            _ = cancellation.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            info!("Host closed bridge input");
            return Ok(());
        };
        let Some(event) = parse_line(&line) else {
            continue;
        };

        tokio::select! {
            _ = cancellation.cancelled() => return Ok(()),
            sent = event_tx.send(event) => {
                if sent.is_err() {
                    debug!("Cover controller gone, closing bridge input");
                    return Ok(());
                }
            }
        }
    }
}

/// Write controller output until both channels close. On cancellation,
/// whatever is already queued is still written.
async fn write_outbound<W>(
    mut writer: W,
    mut notify_rx: mpsc::Receiver<Notification>,
    mut command_rx: mpsc::Receiver<DeviceCommand>,
    cancellation: &CancellationToken,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut notify_open = true;
    let mut command_open = true;

    while notify_open || command_open {
        // Commands first, so the startup request leads the output.
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                while let Ok(command) = command_rx.try_recv() {
                    write_line(&mut writer, &Outbound::from(command)).await?;
                }
                while let Ok(notification) = notify_rx.try_recv() {
                    write_line(&mut writer, &Outbound::from(notification)).await?;
                }
                break;
            }
            command = command_rx.recv(), if command_open => match command {
                Some(command) => write_line(&mut writer, &Outbound::from(command)).await?,
                None => command_open = false,
            },
            notification = notify_rx.recv(), if notify_open => match notification {
                Some(notification) => {
                    write_line(&mut writer, &Outbound::from(notification)).await?;
                }
                None => notify_open = false,
            },
        }
    }

    debug!("Cover controller output closed");
    writer.flush().await?;
    Ok(())
}

/// Parse one host line. Blank and malformed lines yield `None`.
pub fn parse_line(line: &str) -> Option<CoverEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<Inbound>(line) {
        Ok(inbound) => Some(inbound.into()),
        Err(e) => {
            warn!(line, error = %e, "Skipping malformed bridge line");
            None
        }
    }
}

async fn write_line<W>(writer: &mut W, line: &Outbound) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut text = serde_json::to_string(line)?;
    text.push('\n');
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
