//! Polymorphic payload capabilities.
//!
//! Concrete message types are plain serde structs that declare a stable
//! discriminator. The blanket `Payload` impl gives them the object-safe
//! surface the bus needs; `Event` and `Request` add a route, `Response`
//! is a marker.
//!
//! ```ignore
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct InvoiceCreated { invoice_id: String }
//!
//! impl Discriminated for InvoiceCreated {
//!     const DISCRIMINATOR: &'static str = "billing://invoice-created";
//! }
//!
//! impl Event for InvoiceCreated {
//!     fn route(&self) -> Route {
//!         Route::global("billing", "invoice.created")
//!     }
//! }
//! ```

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::route::Route;

/// Stable type tag used on the wire.
pub trait Discriminated {
    const DISCRIMINATOR: &'static str;
}

/// Object-safe view of any discriminated, serializable message.
pub trait Payload: Any + Send + Sync + fmt::Debug {
    fn discriminator(&self) -> &'static str;

    /// Rust type name of the concrete payload, for diagnostics.
    fn type_name(&self) -> &'static str;

    /// Serialize the content (without discriminator).
    fn to_content(&self) -> Result<Value, serde_json::Error>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

impl<T> Payload for T
where
    T: Discriminated + Serialize + Any + Send + Sync + fmt::Debug,
{
    fn discriminator(&self) -> &'static str {
        T::DISCRIMINATOR
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn to_content(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

/// Fire-and-forget message.
pub trait Event: Payload {
    fn route(&self) -> Route;
}

/// Message that expects exactly one `Response`.
pub trait Request: Payload {
    fn route(&self) -> Route;
}

/// Reply to a `Request`.
pub trait Response: Payload {}

macro_rules! impl_downcast {
    ($capability:ident) => {
        impl dyn $capability {
            /// True if the concrete type behind this object is `T`.
            pub fn is<T: $capability>(&self) -> bool {
                self.as_any().is::<T>()
            }

            pub fn downcast_ref<T: $capability>(&self) -> Option<&T> {
                self.as_any().downcast_ref::<T>()
            }

            /// Take ownership of the concrete value, if it is a `T`.
            pub fn downcast<T: $capability>(self: Box<Self>) -> Option<Box<T>> {
                self.into_any().downcast::<T>().ok()
            }
        }
    };
}

impl_downcast!(Event);
impl_downcast!(Request);
impl_downcast!(Response);

/// Reply synthesized when a request cannot be handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl Discriminated for ErrorResponse {
    const DISCRIMINATOR: &'static str = "model://error";
}

impl Response for ErrorResponse {}

/// Empty success marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accepted {}

impl Discriminated for Accepted {
    const DISCRIMINATOR: &'static str = "model://accepted";
}

impl Response for Accepted {}
