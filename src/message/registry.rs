//! Discriminator -> decoder table.
//!
//! Populated once at startup and then shared read-only through a `Codec`.
//! A discriminator can carry more than one capability, each bound to its
//! own concrete type and decoder: an event type and a request type may
//! share a tag without disturbing each other.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::payload::{Accepted, Discriminated, ErrorResponse, Event, Request, Response};

type EventDecoder = fn(Value) -> Result<Box<dyn Event>, serde_json::Error>;
type RequestDecoder = fn(Value) -> Result<Box<dyn Request>, serde_json::Error>;
type ResponseDecoder = fn(Value) -> Result<Box<dyn Response>, serde_json::Error>;

/// One capability of a discriminator: the concrete type and its decoder.
struct Slot<D> {
    type_name: &'static str,
    decode: D,
}

#[derive(Default)]
struct Registration {
    event: Option<Slot<EventDecoder>>,
    request: Option<Slot<RequestDecoder>>,
    response: Option<Slot<ResponseDecoder>>,
}

/// Registry of concrete payload types by discriminator.
///
/// ## Example
///
/// ```ignore
/// let registry = TypeRegistry::new()
///     .event::<InvoiceCreated>()
///     .request::<Ping>()
///     .response::<Pong>();
/// ```
pub struct TypeRegistry {
    entries: HashMap<&'static str, Registration>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a registry holding the built-in `ErrorResponse` and `Accepted`.
    pub fn new() -> Self {
        Self::empty().response::<ErrorResponse>().response::<Accepted>()
    }

    /// Create a registry without the built-in responses.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register `T` as an event.
    pub fn event<T>(mut self) -> Self
    where
        T: Event + Discriminated + DeserializeOwned,
    {
        self.register_event::<T>();
        self
    }

    /// Register `T` as a request.
    pub fn request<T>(mut self) -> Self
    where
        T: Request + Discriminated + DeserializeOwned,
    {
        self.register_request::<T>();
        self
    }

    /// Register `T` as a response.
    pub fn response<T>(mut self) -> Self
    where
        T: Response + Discriminated + DeserializeOwned,
    {
        self.register_response::<T>();
        self
    }

    pub fn register_event<T>(&mut self)
    where
        T: Event + Discriminated + DeserializeOwned,
    {
        let registration = self.entries.entry(T::DISCRIMINATOR).or_default();
        bind::<T, _>(&mut registration.event, "event", decode_event::<T> as EventDecoder);
    }

    pub fn register_request<T>(&mut self)
    where
        T: Request + Discriminated + DeserializeOwned,
    {
        let registration = self.entries.entry(T::DISCRIMINATOR).or_default();
        bind::<T, _>(&mut registration.request, "request", decode_request::<T> as RequestDecoder);
    }

    pub fn register_response<T>(&mut self)
    where
        T: Response + Discriminated + DeserializeOwned,
    {
        let registration = self.entries.entry(T::DISCRIMINATOR).or_default();
        bind::<T, _>(&mut registration.response, "response", decode_response::<T> as ResponseDecoder);
    }

    /// Check if a discriminator is registered under any capability.
    pub fn contains(&self, discriminator: &str) -> bool {
        self.entries.contains_key(discriminator)
    }

    /// Get all registered discriminators.
    pub fn discriminators(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Concrete type registered as the event for a discriminator.
    pub fn event_type(&self, discriminator: &str) -> Option<&'static str> {
        self.entries
            .get(discriminator)
            .and_then(|r| r.event.as_ref())
            .map(|slot| slot.type_name)
    }

    pub fn request_type(&self, discriminator: &str) -> Option<&'static str> {
        self.entries
            .get(discriminator)
            .and_then(|r| r.request.as_ref())
            .map(|slot| slot.type_name)
    }

    pub fn response_type(&self, discriminator: &str) -> Option<&'static str> {
        self.entries
            .get(discriminator)
            .and_then(|r| r.response.as_ref())
            .map(|slot| slot.type_name)
    }

    pub(crate) fn event_decoder(&self, discriminator: &str) -> Option<Option<EventDecoder>> {
        self.entries
            .get(discriminator)
            .map(|r| r.event.as_ref().map(|slot| slot.decode))
    }

    pub(crate) fn request_decoder(&self, discriminator: &str) -> Option<Option<RequestDecoder>> {
        self.entries
            .get(discriminator)
            .map(|r| r.request.as_ref().map(|slot| slot.decode))
    }

    pub(crate) fn response_decoder(&self, discriminator: &str) -> Option<Option<ResponseDecoder>> {
        self.entries
            .get(discriminator)
            .map(|r| r.response.as_ref().map(|slot| slot.decode))
    }
}

/// Bind `T` to one capability slot. Re-binding the same capability to
/// another type replaces it; other capabilities are left alone.
fn bind<T: Discriminated, D>(slot: &mut Option<Slot<D>>, capability: &'static str, decode: D) {
    let type_name = std::any::type_name::<T>();
    if let Some(previous) = slot.as_ref().filter(|s| s.type_name != type_name) {
        tracing::warn!(
            discriminator = T::DISCRIMINATOR,
            capability,
            previous = previous.type_name,
            replacement = type_name,
            "discriminator re-registered with a different type"
        );
    }
    *slot = Some(Slot { type_name, decode });
}

fn decode_event<T>(content: Value) -> Result<Box<dyn Event>, serde_json::Error>
where
    T: Event + DeserializeOwned,
{
    Ok(Box::new(serde_json::from_value::<T>(content)?))
}

fn decode_request<T>(content: Value) -> Result<Box<dyn Request>, serde_json::Error>
where
    T: Request + DeserializeOwned,
{
    Ok(Box::new(serde_json::from_value::<T>(content)?))
}

fn decode_response<T>(content: Value) -> Result<Box<dyn Response>, serde_json::Error>
where
    T: Response + DeserializeOwned,
{
    Ok(Box::new(serde_json::from_value::<T>(content)?))
}
