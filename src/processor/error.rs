//! Error types for handler registration.

use std::fmt;

use thiserror::Error;

use crate::bus::BusError;

/// Handler namespace. Events and requests are registered independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Event,
    Request,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Event => f.write_str("event"),
            Namespace::Request => f.write_str("request"),
        }
    }
}

/// Error type for `Processor` registration.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The discriminator already has a handler in this namespace.
    #[error("{namespace} handler for {discriminator} already registered")]
    Conflict {
        namespace: Namespace,
        discriminator: &'static str,
    },
    /// The bus refused the subscription; nothing was registered.
    #[error("failed to subscribe {namespace} handler for {discriminator}: {source}")]
    Subscribe {
        namespace: Namespace,
        discriminator: &'static str,
        #[source]
        source: BusError,
    },
    /// The bus could not release a subscription; it stays registered.
    #[error("failed to unsubscribe {namespace} handler for {discriminator}: {source}")]
    Unsubscribe {
        namespace: Namespace,
        discriminator: &'static str,
        #[source]
        source: BusError,
    },
    #[error("processor registry lock poisoned")]
    LockPoisoned,
}

impl RegistrationError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, RegistrationError::Conflict { .. })
    }
}
