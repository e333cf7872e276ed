use std::future;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use super::debounce::Request;
use super::engine::{CoverEngine, DeviceCommand, Notification};
use super::property::Property;
use crate::tracing::prelude::*;

/// Inbound event for a cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverEvent {
    /// A message from the device side of the broker.
    Message { topic: String, payload: String },
    /// A property write from the controller.
    Write { property: Property, value: String },
}

/// Actor owning one [`CoverEngine`].
///
/// Events are handled one at a time, so the engine needs no locking. The
/// debounce timer is a `sleep_until` rebuilt from the engine's deadline on
/// every loop iteration: re-arming the debouncer drops the old sleep, so a
/// superseded timer never fires.
pub struct CoverController {
    engine: CoverEngine,
    event_rx: mpsc::Receiver<CoverEvent>,
    notify_tx: mpsc::Sender<Notification>,
    command_tx: mpsc::Sender<DeviceCommand>,
}

impl CoverController {
    pub fn new(
        engine: CoverEngine,
        event_rx: mpsc::Receiver<CoverEvent>,
        notify_tx: mpsc::Sender<Notification>,
        command_tx: mpsc::Sender<DeviceCommand>,
    ) -> Self {
        Self {
            engine,
            event_rx,
            notify_tx,
            command_tx,
        }
    }

    pub fn engine(&self) -> &CoverEngine {
        &self.engine
    }

    /// Run until cancelled or the event channel closes.
    ///
    /// Any pending (uncommitted) target is discarded on exit.
    pub async fn run(mut self, cancellation: CancellationToken) {
        info!(cover = %self.engine.name(), "Cover controller started");

        let startup = self.engine.startup_command();
        self.send_command(startup).await;

        loop {
            let deadline = self.engine.next_deadline();

            tokio::select! {
                _ = cancellation.cancelled() => {
                    break;
                }
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle(event).await,
                        None => {
                            debug!("Cover event channel closed");
                            break;
                        }
                    }
                }
                _ = sleep_until(deadline) => {
                    self.commit_due().await;
                }
            }
        }

        if let Some(target) = self.engine.pending_target() {
            debug!(target = %target, "Discarding uncommitted target on shutdown");
        }
        info!(cover = %self.engine.name(), "Cover controller stopped");
    }

    async fn handle(&mut self, event: CoverEvent) {
        let now = Instant::now();

        match event {
            CoverEvent::Message { topic, payload } => {
                let properties = self.engine.topics().properties_for(&topic);
                if properties.is_empty() {
                    debug!(topic = %topic, "Ignoring message on unsubscribed topic");
                    return;
                }

                match self.engine.decode_properties(&payload, properties, now) {
                    Ok(notifications) => {
                        for notification in notifications {
                            self.notify(notification).await;
                        }
                    }
                    Err(e) => {
                        warn!(topic = %topic, error = %e, "Undecodable device message");
                    }
                }
            }
            CoverEvent::Write { property, value } => {
                match self.engine.encode(&value, property, now) {
                    Ok(Request::Armed { deadline }) => {
                        trace!(
                            value = %value,
                            due_in_ms = deadline.saturating_duration_since(now).as_millis() as u64,
                            "Target write armed"
                        );
                    }
                    Ok(Request::Unchanged) => {
                        debug!(value = %value, "Target write matches committed target");
                    }
                    Err(e) => {
                        warn!(%property, value = %value, error = %e, "Rejected controller write");
                    }
                }
            }
        }
    }

    async fn commit_due(&mut self) {
        if let Some(command) = self.engine.poll_commit(Instant::now()) {
            self.send_command(command).await;
        }
    }

    async fn notify(&self, notification: Notification) {
        if self.notify_tx.send(notification).await.is_err() {
            debug!(?notification, "Notification channel closed");
        }
    }

    async fn send_command(&self, command: DeviceCommand) {
        if self.command_tx.send(command).await.is_err() {
            debug!("Device command channel closed");
        }
    }
}

/// Sleep until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
