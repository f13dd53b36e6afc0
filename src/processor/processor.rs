//! Processor - typed handler registry on top of the message bus.
//!
//! `Processor<T>` keeps one handler per discriminator (events and requests
//! are separate namespaces) and owns the subscriptions it creates.
//!
//! ## Example
//!
//! ```ignore
//! let processor = Processor::new(bus.clone()).with_queue_group("billing-workers");
//!
//! processor.on_event(|ctx, event: InvoiceCreated| {
//!     tracing::info!(invoice = %event.invoice_id, correlation = %ctx.correlation_id());
//!     Ok(())
//! })?;
//!
//! processor.on_request(|_ctx, ping: Ping| Ok(Pong { seq: ping.seq }))?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::{Namespace, RegistrationError};
use crate::bus::{MessageBus, Subscription, SubscriptionOpts, Transport};
use crate::context::MessageContext;
use crate::handler::{event_handler, request_handler, EventHandler, HandlerError, RequestHandler};
use crate::message::{Event, Request, Response};

#[derive(Default)]
struct Registry {
    event_handlers: HashMap<&'static str, EventHandler>,
    request_handlers: HashMap<&'static str, RequestHandler>,
    subscriptions: HashMap<(Namespace, &'static str), Subscription>,
}

/// Typed handler registry bound to a `MessageBus`.
///
/// Registration may race with traffic; the registry is behind a mutex and
/// dispatch never takes it (the bus binds each handler directly).
pub struct Processor<T: Transport> {
    bus: Arc<MessageBus<T>>,
    queue_group: Option<String>,
    registry: Mutex<Registry>,
}

impl<T: Transport + 'static> Processor<T> {
    /// Create a processor over a shared bus.
    pub fn new(bus: Arc<MessageBus<T>>) -> Self {
        Self {
            bus,
            queue_group: None,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Load-balance every event handler of this processor across `group`.
    ///
    /// Uses builder pattern and applies to registrations made afterwards.
    pub fn with_queue_group(mut self, group: impl Into<String>) -> Self {
        self.queue_group = Some(group.into()).filter(|g: &String| !g.is_empty());
        self
    }

    /// Get a reference to the bus.
    pub fn bus(&self) -> &MessageBus<T> {
        &self.bus
    }

    /// Register an event handler for the discriminator and route of `event`.
    ///
    /// `event` is only read for its discriminator and route; a default
    /// instance of an org event subscribes to every tenant.
    pub fn register_event_handler<E: Event + ?Sized>(
        &self,
        event: &E,
        handler: EventHandler,
    ) -> Result<(), RegistrationError> {
        let discriminator = event.discriminator();
        let route = event.route();
        let mut registry = self.registry()?;

        if registry.event_handlers.contains_key(discriminator) {
            return Err(RegistrationError::Conflict {
                namespace: Namespace::Event,
                discriminator,
            });
        }

        registry
            .event_handlers
            .insert(discriminator, Arc::clone(&handler));

        let opts = self
            .queue_group
            .as_ref()
            .map(SubscriptionOpts::queue_group)
            .unwrap_or_default();

        match self.bus.subscribe_with_options(&route, handler, opts) {
            Ok(subscription) => {
                registry
                    .subscriptions
                    .insert((Namespace::Event, discriminator), subscription);
                tracing::debug!(discriminator, route = %route, "registered event handler");
                Ok(())
            }
            Err(source) => {
                registry.event_handlers.remove(discriminator);
                Err(RegistrationError::Subscribe {
                    namespace: Namespace::Event,
                    discriminator,
                    source,
                })
            }
        }
    }

    /// Register a request handler for the discriminator and route of `request`.
    pub fn register_request_handler<R: Request + ?Sized>(
        &self,
        request: &R,
        handler: RequestHandler,
    ) -> Result<(), RegistrationError> {
        let discriminator = request.discriminator();
        let route = request.route();
        let mut registry = self.registry()?;

        if registry.request_handlers.contains_key(discriminator) {
            return Err(RegistrationError::Conflict {
                namespace: Namespace::Request,
                discriminator,
            });
        }

        registry
            .request_handlers
            .insert(discriminator, Arc::clone(&handler));

        match self.bus.subscribe_request(&route, handler) {
            Ok(subscription) => {
                registry
                    .subscriptions
                    .insert((Namespace::Request, discriminator), subscription);
                tracing::debug!(discriminator, route = %route, "registered request handler");
                Ok(())
            }
            Err(source) => {
                registry.request_handlers.remove(discriminator);
                Err(RegistrationError::Subscribe {
                    namespace: Namespace::Request,
                    discriminator,
                    source,
                })
            }
        }
    }

    /// Register a handler that receives events already downcast to `E`.
    pub fn on_event<E, F>(&self, handler: F) -> Result<(), RegistrationError>
    where
        E: Event + Default,
        F: Fn(&MessageContext, E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register_event_handler(&E::default(), typed_event_handler(handler))
    }

    /// Register a handler that receives requests already downcast to `Q`
    /// and returns a concrete response type.
    pub fn on_request<Q, R, F>(&self, handler: F) -> Result<(), RegistrationError>
    where
        Q: Request + Default,
        R: Response,
        F: Fn(&MessageContext, Q) -> Result<R, HandlerError> + Send + Sync + 'static,
    {
        self.register_request_handler(&Q::default(), typed_request_handler(handler))
    }

    /// Check if a discriminator has a handler in the given namespace.
    pub fn is_registered(&self, namespace: Namespace, discriminator: &str) -> bool {
        self.registry
            .lock()
            .map(|registry| match namespace {
                Namespace::Event => registry.event_handlers.contains_key(discriminator),
                Namespace::Request => registry.request_handlers.contains_key(discriminator),
            })
            .unwrap_or(false)
    }

    /// List registered event discriminators, sorted.
    pub fn event_discriminators(&self) -> Vec<&'static str> {
        self.discriminators(Namespace::Event)
    }

    /// List registered request discriminators, sorted.
    pub fn request_discriminators(&self) -> Vec<&'static str> {
        self.discriminators(Namespace::Request)
    }

    /// Subject of the subscription owned for a discriminator.
    pub fn subscription_subject(&self, namespace: Namespace, discriminator: &str) -> Option<String> {
        let registry = self.registry.lock().ok()?;
        registry
            .subscriptions
            .iter()
            .find(|((ns, d), _)| *ns == namespace && *d == discriminator)
            .map(|(_, subscription)| subscription.subject().to_string())
    }

    /// Unsubscribe everything this processor registered.
    ///
    /// Every subscription is attempted. A registration is dropped only once
    /// its subscription is released; failed ones stay registered so that
    /// `shutdown` can be retried. The first failure is returned.
    pub fn shutdown(&self) -> Result<(), RegistrationError> {
        let mut registry = self.registry()?;
        let keys: Vec<(Namespace, &'static str)> = registry.subscriptions.keys().copied().collect();

        let mut first_error = None;
        for key in keys {
            let (namespace, discriminator) = key;
            let Some(subscription) = registry.subscriptions.get(&key) else {
                continue;
            };

            match self.bus.unsubscribe(subscription) {
                Ok(()) => {
                    registry.subscriptions.remove(&key);
                    if namespace == Namespace::Event {
                        registry.event_handlers.remove(discriminator);
                    } else {
                        registry.request_handlers.remove(discriminator);
                    }
                }
                Err(source) => {
                    tracing::warn!(%namespace, discriminator, error = %source, "failed to release subscription");
                    first_error.get_or_insert(RegistrationError::Unsubscribe {
                        namespace,
                        discriminator,
                        source,
                    });
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn discriminators(&self, namespace: Namespace) -> Vec<&'static str> {
        let mut discriminators: Vec<&'static str> = self
            .registry
            .lock()
            .map(|registry| match namespace {
                Namespace::Event => registry.event_handlers.keys().copied().collect(),
                Namespace::Request => registry.request_handlers.keys().copied().collect(),
            })
            .unwrap_or_default();
        discriminators.sort_unstable();
        discriminators
    }

    fn registry(&self) -> Result<MutexGuard<'_, Registry>, RegistrationError> {
        self.registry
            .lock()
            .map_err(|_| RegistrationError::LockPoisoned)
    }
}

/// Wrap a typed event handler. A payload of any other concrete type is a
/// dispatch bug and fails with `HandlerError::ContractViolation`.
pub fn typed_event_handler<E, F>(handler: F) -> EventHandler
where
    E: Event,
    F: Fn(&MessageContext, E) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    event_handler(move |ctx, event| {
        let actual = event.type_name();
        match event.downcast::<E>() {
            Some(event) => handler(ctx, *event),
            None => Err(contract_violation(std::any::type_name::<E>(), actual)),
        }
    })
}

/// Wrap a typed request handler. See `typed_event_handler`.
pub fn typed_request_handler<Q, R, F>(handler: F) -> RequestHandler
where
    Q: Request,
    R: Response,
    F: Fn(&MessageContext, Q) -> Result<R, HandlerError> + Send + Sync + 'static,
{
    request_handler(move |ctx, request| {
        let actual = request.type_name();
        match request.downcast::<Q>() {
            Some(request) => {
                let response: Box<dyn Response> = Box::new(handler(ctx, *request)?);
                Ok(response)
            }
            None => Err(contract_violation(std::any::type_name::<Q>(), actual)),
        }
    })
}

fn contract_violation(expected: &'static str, actual: &'static str) -> HandlerError {
    tracing::error!(expected, actual, "handler received a payload of the wrong type");
    HandlerError::ContractViolation { expected, actual }
}
