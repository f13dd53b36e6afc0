pub mod bus;
pub mod config;
pub mod context;
pub mod handler;
pub mod message;
pub mod processor;
pub mod route;

pub use bus::{
    BusError, InMemoryTransport, MessageBus, Subscription, SubscriptionOpts, Transport,
    TransportError, TransportMessage,
};
pub use config::{BrokerConfig, ConfigError};
pub use context::{Headers, MessageContext, CAUSATION_ID_HEADER, CORRELATION_ID_HEADER};
pub use handler::{event_handler, request_handler, EventHandler, HandlerError, RequestHandler};
pub use message::{
    Accepted, Codec, CodecError, Discriminated, Envelope, ErrorResponse, Event, Payload, Request,
    Response, TypeRegistry,
};
pub use processor::{Namespace, Processor, RegistrationError};
pub use route::{AddressError, Route, Scope, WILDCARD};

// Re-export uuid so payload types can name organization ids without a direct dependency
pub use uuid::Uuid;
