//! Notify Module
//!
//! Best-effort delivery of repository notifications to the pollers.
//!
//! ```text
//! handler ──dispatch──▶ Dispatcher ──try_send──▶ channel ──▶ BusForwarder ──▶ NATS
//!                        (retries with backoff)             (logs failures)
//! ```

pub mod backoff;
pub mod bus;
pub mod channel;
pub mod dispatcher;
pub mod forwarder;

pub use backoff::Backoff;
pub use bus::{BusError, MessageBus, NatsBus};
pub use channel::{NotificationReceiver, NotificationSender, Payload, notification_channel};
pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherConfig};
pub use forwarder::{BusForwarder, ForwarderStats};
