//! Message bus - notify/request over a pluggable transport.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  MessageBus (per service)                    │
//! │  notify / request / subscribe / subscribe_request            │
//! │  Route -> subject, payload -> Envelope, headers -> context   │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Transport trait                         │
//! │  publish / request / subscribe / unsubscribe / respond       │
//! └─────────────────────────────────────────────────────────────┘
//!          │                                    │
//!          ▼                                    ▼
//! ┌──────────────────┐              ┌─────────────────────────┐
//! │InMemoryTransport │              │   NATS client adapter    │
//! │   (included)     │              │       (external)         │
//! └──────────────────┘              └─────────────────────────┘
//! ```
//!
//! Deliveries run concurrently: one thread (or task) per message, as
//! supplied by the transport. Handlers must tolerate concurrent calls.

mod error;
mod in_memory;
mod message_bus;
mod subscription;
mod transport;

pub use error::BusError;
pub use in_memory::{InMemoryTransport, DEFAULT_LOG_CAPACITY};
pub use message_bus::{MessageBus, INVALID_REQUEST_FORMAT};
pub use subscription::{Subscription, SubscriptionOpts};
pub use transport::{
    subject_matches, MessageCallback, SubscriptionId, Transport, TransportError,
    TransportMessage,
};
