use thiserror::Error;

/// Error type for envelope encode/decode.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload could not be serialized. Not retried.
    #[error("failed to encode {discriminator}: {source}")]
    Encode {
        discriminator: String,
        #[source]
        source: serde_json::Error,
    },
    /// The bytes are not a valid envelope.
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),
    /// No type is registered for the discriminator.
    #[error("unknown discriminator: {0}")]
    UnknownDiscriminator(String),
    /// The registered type does not have the requested capability.
    #[error("{discriminator} is not registered as {expected}")]
    CapabilityMismatch {
        discriminator: String,
        expected: &'static str,
    },
    /// The content does not deserialize into the registered type.
    #[error("invalid content for {discriminator}: {source}")]
    InvalidContent {
        discriminator: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CodecError {
    /// True for every decode-side failure.
    pub fn is_decode(&self) -> bool {
        !matches!(self, CodecError::Encode { .. })
    }
}
