//! Bus forwarder
//!
//! Drains the notification channel for the lifetime of the process and
//! publishes every payload on the bus. The dispatcher already retried before
//! the payload entered the channel, so a failed publish is logged and the
//! forwarder moves on to the next payload.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::notify::bus::MessageBus;
use crate::notify::channel::NotificationReceiver;

/// Counters reported when the forwarder stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderStats {
    pub published: u64,
    pub failed: u64,
}

/// Single consumer of the notification channel
pub struct BusForwarder {
    bus: Arc<dyn MessageBus>,
    subject: String,
}

impl BusForwarder {
    pub fn new(bus: Arc<dyn MessageBus>, subject: impl Into<String>) -> Self {
        Self {
            bus,
            subject: subject.into(),
        }
    }

    /// Runs the forwarding loop on its own task
    pub fn spawn(self, receiver: NotificationReceiver) -> JoinHandle<ForwarderStats> {
        let span = info_span!("bus_forwarder", subject = %self.subject);
        tokio::spawn(self.run(receiver).instrument(span))
    }

    /// Forwards payloads until every sender is gone
    pub async fn run(self, mut receiver: NotificationReceiver) -> ForwarderStats {
        let mut stats = ForwarderStats::default();

        info!("queue sender initialized");

        while let Some(payload) = receiver.recv().await {
            debug!("sending data: {}", String::from_utf8_lossy(&payload));

            match self.bus.publish(&self.subject, payload.clone()).await {
                Ok(()) => stats.published += 1,
                Err(e) => {
                    stats.failed += 1;
                    error!(
                        error = %e,
                        message = %String::from_utf8_lossy(&payload),
                        "unable to send message"
                    );
                }
            }
        }

        if let Err(e) = self.bus.flush().await {
            warn!(error = %e, "unable to flush message bus");
        }

        info!(
            published = stats.published,
            failed = stats.failed,
            "notification channel closed, forwarder stopped"
        );

        stats
    }
}
