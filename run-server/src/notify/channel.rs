//! Notification channel
//!
//! Bounded multi-producer, single-consumer conduit between request handlers
//! and the bus forwarder. The capacity is kept small on purpose: a send that
//! can't be accepted right away must fail so the dispatcher can back off.

use tokio::sync::mpsc;

/// Serialized notification as it travels through the channel
pub type Payload = Vec<u8>;

/// Why a non-blocking send was refused
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The consumer isn't keeping up; the payload can be retried
    #[error("notification channel is full")]
    Full(Payload),

    /// No consumer is attached; the payload can be retried
    #[error("notification channel is closed")]
    Closed(Payload),
}

impl ChannelError {
    /// Gives the refused payload back to the caller
    pub fn into_payload(self) -> Payload {
        match self {
            ChannelError::Full(payload) | ChannelError::Closed(payload) => payload,
        }
    }
}

/// Producer side, cheap to clone
#[derive(Debug, Clone)]
pub struct NotificationSender {
    inner: mpsc::Sender<Payload>,
}

impl NotificationSender {
    /// Attempts to hand a payload over without waiting
    pub fn try_send(&self, payload: Payload) -> Result<(), ChannelError> {
        self.inner.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(payload) => ChannelError::Full(payload),
            mpsc::error::TrySendError::Closed(payload) => ChannelError::Closed(payload),
        })
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Consumer side, owned by exactly one forwarder
#[derive(Debug)]
pub struct NotificationReceiver {
    inner: mpsc::Receiver<Payload>,
}

impl NotificationReceiver {
    /// Waits for the next payload, `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<Payload> {
        self.inner.recv().await
    }
}

/// Creates a notification channel holding at most `capacity` payloads
///
/// # Panics
/// Panics if `capacity` is zero; configuration validation rejects that first.
pub fn notification_channel(capacity: usize) -> (NotificationSender, NotificationReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        NotificationSender { inner: tx },
        NotificationReceiver { inner: rx },
    )
}
