//! Processor - handler registration with conflict detection.
//!
//! A processor owns the subscriptions it creates. Registering a second
//! handler for a discriminator already taken in the same namespace fails
//! and leaves the first handler in place.

mod error;
#[allow(clippy::module_inception)]
mod processor;

pub use error::{Namespace, RegistrationError};
pub use processor::{typed_event_handler, typed_request_handler, Processor};
