//! Messages - discriminated payloads and the envelope codec.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Concrete payload (serde struct + Discriminated)          │
//! │  impl Event / Request / Response                          │
//! └──────────────────────────────────────────────────────────┘
//!                            │ Codec::encode
//!                            ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Envelope { discriminator, content }  (JSON bytes)        │
//! └──────────────────────────────────────────────────────────┘
//!                            │ Codec::decode::<dyn Event>()
//!                            ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  TypeRegistry: discriminator -> decoder per capability    │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod envelope;
mod error;
mod payload;
mod registry;

pub use envelope::{Capability, Codec, Envelope};
pub use error::CodecError;
pub use payload::{
    Accepted, Discriminated, ErrorResponse, Event, Payload, Request, Response,
};
pub use registry::TypeRegistry;
