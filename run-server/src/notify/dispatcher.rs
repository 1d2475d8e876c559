//! Backoff dispatcher
//!
//! Best-effort delivery of notifications onto the notification channel.
//! `dispatch` never waits: it spawns a supervised task that tries a
//! non-blocking send, backing off with jitter between attempts, and drops the
//! notification once the attempts run out.
//!
//! Supervision rules:
//! - At most `max_in_flight` dispatch tasks exist at once; beyond that new
//!   notifications are dropped with a warning.
//! - After `shutdown`, pending tasks abandon their retries at the next sleep
//!   and new dispatches are refused.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info_span, warn};

use crate::notify::backoff::Backoff;
use crate::notify::channel::{NotificationSender, Payload};

/// Default number of dispatch tasks allowed to run at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;

/// Dispatcher tuning
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub backoff: Backoff,
    pub max_in_flight: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            backoff: Backoff::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// How a single dispatch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handed to the consumer on the given attempt (1-based)
    Delivered { attempt: u32 },

    /// Every attempt found the channel full or without a consumer
    Exhausted { attempts: u32 },

    /// Shutdown interrupted the retries after the given attempt
    Abandoned { attempt: u32 },
}

/// Handle used by request handlers to send notifications
///
/// Cloning is cheap; all clones share the same channel, permits and
/// shutdown token.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    sender: NotificationSender,
    backoff: Backoff,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    shutdown: CancellationToken,
    span: Span,
}

impl Dispatcher {
    pub fn new(sender: NotificationSender, config: DispatcherConfig) -> Self {
        let span = info_span!(
            "notifications",
            max_attempts = config.backoff.max_attempts(),
            max_in_flight = config.max_in_flight
        );

        Self {
            inner: Arc::new(Inner {
                sender,
                backoff: config.backoff,
                permits: Arc::new(Semaphore::new(config.max_in_flight)),
                max_in_flight: config.max_in_flight,
                shutdown: CancellationToken::new(),
                span,
            }),
        }
    }

    /// Starts delivering `payload` in the background and returns at once
    ///
    /// The returned handle resolves to the outcome; callers are free to drop
    /// it. `None` means the payload was dropped before any attempt, either
    /// because too many dispatches are in flight or because the dispatcher
    /// is shutting down.
    pub fn dispatch(
        &self,
        request_id: &str,
        payload: Payload,
    ) -> Option<JoinHandle<DispatchOutcome>> {
        let span = info_span!(parent: &self.inner.span, "dispatch", request_id = %request_id);

        if self.is_shut_down() {
            span.in_scope(|| warn!("dispatcher is shut down, dropping notification"));
            return None;
        }

        let permit = match Arc::clone(&self.inner.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                span.in_scope(|| warn!("too many notifications in flight, dropping notification"));
                return None;
            }
        };

        let sender = self.inner.sender.clone();
        let backoff = self.inner.backoff;
        let shutdown = self.inner.shutdown.clone();

        Some(tokio::spawn(
            async move {
                let _permit: OwnedSemaphorePermit = permit;
                let mut rng = StdRng::from_entropy();
                deliver(&sender, backoff, &shutdown, payload, &mut rng).await
            }
            .instrument(span),
        ))
    }

    /// Stops accepting dispatches and interrupts pending retries
    pub fn shutdown(&self) {
        let _enter = self.inner.span.enter();
        debug!(
            in_flight = self.in_flight(),
            "shutting down notification dispatcher"
        );
        self.inner.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Number of dispatch tasks currently running
    pub fn in_flight(&self) -> usize {
        let available = self.inner.permits.available_permits();
        self.inner.max_in_flight.saturating_sub(available)
    }
}

/// Retry loop of one dispatch
async fn deliver<R: Rng + Send>(
    sender: &NotificationSender,
    backoff: Backoff,
    shutdown: &CancellationToken,
    mut payload: Payload,
    rng: &mut R,
) -> DispatchOutcome {
    let max_attempts = backoff.max_attempts();

    for index in 0..max_attempts {
        let attempt = index + 1;

        match sender.try_send(payload) {
            Ok(()) => {
                debug!(attempt, "notification sent");
                return DispatchOutcome::Delivered { attempt };
            }
            Err(err) => {
                // A closed channel counts as a failed attempt; the consumer
                // may only be missing for now.
                let reason = err.to_string();
                payload = err.into_payload();

                if attempt == max_attempts {
                    break;
                }

                let delay = backoff.delay(index, rng);
                warn!(
                    attempt,
                    error = %reason,
                    delay_ms = delay.as_millis() as u64,
                    "unable to send notification, sleeping for {:?}",
                    delay
                );

                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        warn!(attempt, "shutting down, abandoning notification");
                        return DispatchOutcome::Abandoned { attempt };
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    warn!(
        attempts = max_attempts,
        "unable to send notification after {} attempts, dropping it", max_attempts
    );
    DispatchOutcome::Exhausted {
        attempts: max_attempts,
    }
}
