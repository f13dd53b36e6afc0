use std::time::Duration;

use thiserror::Error;

use super::transport::TransportError;
use crate::message::CodecError;
use crate::route::AddressError;

/// Error type for bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    /// The route cannot be addressed.
    #[error(transparent)]
    Address(#[from] AddressError),
    /// Encode or decode failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// No reply within the caller's timeout.
    #[error("request on {subject} timed out after {timeout:?}")]
    Timeout { subject: String, timeout: Duration },
    /// Error from the transport, unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BusError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BusError::Timeout { .. })
    }
}
