//! Handler signatures shared by the bus and the processor.

use std::error::Error;
use std::sync::Arc;

use thiserror::Error;

use crate::bus::BusError;
use crate::context::MessageContext;
use crate::message::{Event, Request, Response};

/// Processes an event. Errors are logged, never sent anywhere.
pub type EventHandler =
    Arc<dyn Fn(&MessageContext, Box<dyn Event>) -> Result<(), HandlerError> + Send + Sync>;

/// Processes a request and produces its response. Errors become an
/// `ErrorResponse` carrying the error text.
pub type RequestHandler = Arc<
    dyn Fn(&MessageContext, Box<dyn Request>) -> Result<Box<dyn Response>, HandlerError>
        + Send
        + Sync,
>;

/// Box a closure as an `EventHandler`.
pub fn event_handler<F>(handler: F) -> EventHandler
where
    F: Fn(&MessageContext, Box<dyn Event>) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Box a closure as a `RequestHandler`.
pub fn request_handler<F>(handler: F) -> RequestHandler
where
    F: Fn(&MessageContext, Box<dyn Request>) -> Result<Box<dyn Response>, HandlerError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(handler)
}

/// Error type for message handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Plain error text, sent back verbatim.
    #[error("{0}")]
    Message(String),
    /// The handler refused the message, e.g. it failed validation.
    #[error("rejected: {0}")]
    Rejected(String),
    /// A typed handler received a payload of another concrete type.
    /// Indicates a registry/dispatch bug.
    #[error("handler for {expected} received {actual}")]
    ContractViolation {
        expected: &'static str,
        actual: &'static str,
    },
    /// Outbound bus call made by the handler failed.
    #[error(transparent)]
    Bus(#[from] BusError),
    /// Other error.
    #[error("{0}")]
    Other(Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    /// Error whose text is sent back as-is.
    pub fn msg(text: impl Into<String>) -> Self {
        HandlerError::Message(text.into())
    }

    /// Wrap any error.
    pub fn other<E: Error + Send + Sync + 'static>(err: E) -> Self {
        HandlerError::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Other(Box::new(err))
    }
}
