//! Transport capability consumed by the bus.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::context::Headers;

/// A message as seen by the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportMessage {
    /// Subject the message is published on.
    pub subject: String,
    /// Serialized envelope.
    pub data: Vec<u8>,
    /// Optional headers (correlation IDs, etc.)
    pub headers: Headers,
    /// Reply subject for request/reply.
    pub reply: Option<String>,
}

impl TransportMessage {
    pub fn new(subject: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            subject: subject.into(),
            data,
            headers: Headers::new(),
            reply: None,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Add a single header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Get the data as a string (if valid UTF-8).
    pub fn data_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Transport-level subscription handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Callback invoked for every delivery on a subscription.
pub type MessageCallback = Arc<dyn Fn(TransportMessage) + Send + Sync>;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection has been closed.
    #[error("connection closed")]
    Closed,
    /// Connection to the broker failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// No reply arrived in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),
    /// `respond` was called on a message without a reply subject.
    #[error("message on {0} has no reply subject")]
    NoReplySubject(String),
    #[error("transport lock poisoned during {0}")]
    LockPoisoned(&'static str),
    #[error("transport error: {0}")]
    Other(Box<dyn Error + Send + Sync>),
}

/// Publish/subscribe transport.
///
/// Implementations might include:
/// - `InMemoryTransport` - For testing and single-process scenarios
/// - A NATS client - subjects, queue groups and inboxes map one-to-one
///
/// Implementations must be safe for concurrent use; the bus does not guard
/// them. Each delivery should run on its own thread or task.
pub trait Transport: Send + Sync {
    /// Fire-and-forget publish.
    fn publish(&self, message: TransportMessage) -> Result<(), TransportError>;

    /// Publish and block until one reply arrives or `timeout` elapses.
    fn request(
        &self,
        message: TransportMessage,
        timeout: Duration,
    ) -> Result<TransportMessage, TransportError>;

    /// Deliver every message matching `subject` to `on_message`.
    ///
    /// With a queue group, at most one member of the group receives each
    /// message.
    fn subscribe(
        &self,
        subject: &str,
        queue_group: Option<&str>,
        on_message: MessageCallback,
    ) -> Result<SubscriptionId, TransportError>;

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), TransportError>;

    /// Reply to a message received through `subscribe`.
    fn respond(&self, original: &TransportMessage, data: Vec<u8>) -> Result<(), TransportError>;

    /// Release the connection.
    fn close(&self) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn publish(&self, message: TransportMessage) -> Result<(), TransportError> {
        (**self).publish(message)
    }

    fn request(
        &self,
        message: TransportMessage,
        timeout: Duration,
    ) -> Result<TransportMessage, TransportError> {
        (**self).request(message, timeout)
    }

    fn subscribe(
        &self,
        subject: &str,
        queue_group: Option<&str>,
        on_message: MessageCallback,
    ) -> Result<SubscriptionId, TransportError> {
        (**self).subscribe(subject, queue_group, on_message)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), TransportError> {
        (**self).unsubscribe(id)
    }

    fn respond(&self, original: &TransportMessage, data: Vec<u8>) -> Result<(), TransportError> {
        (**self).respond(original, data)
    }

    fn close(&self) -> Result<(), TransportError> {
        (**self).close()
    }
}

/// Match a subject against a subscription pattern.
///
/// `*` matches exactly one token, a trailing `>` matches one or more.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => {}
            (Some(p), Some(s)) if p == s => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
