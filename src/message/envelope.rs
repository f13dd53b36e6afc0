//! Envelope codec - the wire contract for polymorphic payloads.
//!
//! ```json
//! { "discriminator": "model://error", "content": { "error": "boom" } }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::CodecError;
use super::payload::{Event, Payload, Request, Response};
use super::registry::TypeRegistry;

/// Wire representation: discriminator plus serialized content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub discriminator: String,
    pub content: Value,
}

impl Envelope {
    /// Wrap a payload with its discriminator.
    pub fn wrap<P: Payload + ?Sized>(payload: &P) -> Result<Self, CodecError> {
        let content = payload.to_content().map_err(|source| CodecError::Encode {
            discriminator: payload.discriminator().to_string(),
            source,
        })?;
        Ok(Self {
            discriminator: payload.discriminator().to_string(),
            content,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|source| CodecError::Encode {
            discriminator: self.discriminator.clone(),
            source,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(CodecError::Malformed)
    }
}

/// A capability a decoded payload can be asserted to have.
///
/// Implemented for `dyn Event`, `dyn Request` and `dyn Response`.
pub trait Capability {
    const NAME: &'static str;

    #[doc(hidden)]
    fn resolve(
        registry: &TypeRegistry,
        envelope: Envelope,
    ) -> Result<Box<Self>, CodecError>;
}

macro_rules! impl_capability {
    ($capability:ident, $lookup:ident) => {
        impl Capability for dyn $capability {
            const NAME: &'static str = stringify!($capability);

            fn resolve(
                registry: &TypeRegistry,
                envelope: Envelope,
            ) -> Result<Box<Self>, CodecError> {
                let Envelope {
                    discriminator,
                    content,
                } = envelope;

                let decoder = registry
                    .$lookup(&discriminator)
                    .ok_or_else(|| CodecError::UnknownDiscriminator(discriminator.clone()))?
                    .ok_or_else(|| CodecError::CapabilityMismatch {
                        discriminator: discriminator.clone(),
                        expected: Self::NAME,
                    })?;

                decoder(content).map_err(|source| CodecError::InvalidContent {
                    discriminator,
                    source,
                })
            }
        }
    };
}

impl_capability!(Event, event_decoder);
impl_capability!(Request, request_decoder);
impl_capability!(Response, response_decoder);

/// Encodes payloads into envelopes and resolves envelopes back through a
/// shared `TypeRegistry`.
#[derive(Clone)]
pub struct Codec {
    registry: Arc<TypeRegistry>,
}

impl Codec {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn from_shared(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Serialize a payload inside an envelope.
    pub fn encode<P: Payload + ?Sized>(&self, payload: &P) -> Result<Vec<u8>, CodecError> {
        Envelope::wrap(payload)?.to_bytes()
    }

    /// Deserialize an envelope and assert the payload has capability `T`.
    pub fn decode<T: Capability + ?Sized>(&self, bytes: &[u8]) -> Result<Box<T>, CodecError> {
        let envelope = Envelope::from_bytes(bytes)?;
        T::resolve(&self.registry, envelope)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(TypeRegistry::new())
    }
}
