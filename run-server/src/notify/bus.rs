//! Message bus
//!
//! The bus is where notifications leave the process. The forwarder only needs
//! `publish`, so the trait stays small; NATS is the production implementation.

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::notify::channel::Payload;

/// Number of reconnection attempts after the first failed connect
const CONNECT_RETRIES: u32 = 3;

/// Errors reported by a message bus
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("unable to connect to message bus at {url}: {message}")]
    Connect { url: String, message: String },

    #[error("unable to publish to {subject}: {message}")]
    Publish { subject: String, message: String },

    #[error("unable to flush message bus: {0}")]
    Flush(String),
}

/// Destination for serialized notifications
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes one payload on `subject`
    async fn publish(&self, subject: &str, payload: Payload) -> Result<(), BusError>;

    /// Waits until previously published payloads have left the process
    async fn flush(&self) -> Result<(), BusError> {
        Ok(())
    }
}

/// NATS-backed message bus
#[derive(Clone)]
pub struct NatsBus {
    client: Client,
}

impl NatsBus {
    /// Connects to NATS at `url`
    ///
    /// A failed connect is retried up to three times, sleeping 2s, 4s and 8s
    /// in between.
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let mut retry = 0;

        loop {
            match Self::try_connect(url).await {
                Ok(bus) => {
                    info!(url, "connected to nats");
                    return Ok(bus);
                }
                Err(err) if retry < CONNECT_RETRIES => {
                    retry += 1;
                    let timeout = Duration::from_secs(1 << retry);
                    warn!(
                        error = %err,
                        "error connecting to nats, retrying after {:?}", timeout
                    );
                    tokio::time::sleep(timeout).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_connect(url: &str) -> Result<Self, BusError> {
        debug!(url, "connecting to nats");

        let options = ConnectOptions::new()
            .name("run-server")
            .connection_timeout(Duration::from_secs(5));

        let client = async_nats::connect_with_options(url, options)
            .await
            .map_err(|e| BusError::Connect {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl MessageBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Payload) -> Result<(), BusError> {
        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| BusError::Publish {
                subject: subject.to_string(),
                message: e.to_string(),
            })
    }

    async fn flush(&self) -> Result<(), BusError> {
        self.client
            .flush()
            .await
            .map_err(|e| BusError::Flush(e.to_string()))
    }
}
