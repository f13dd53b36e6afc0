//! Message bus - routes, envelopes and tracing over a transport.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::error::BusError;
use super::subscription::{Subscription, SubscriptionOpts};
use super::transport::{MessageCallback, Transport, TransportError, TransportMessage};
use crate::context::MessageContext;
use crate::handler::{EventHandler, RequestHandler};
use crate::message::{Codec, ErrorResponse, Event, Request, Response, TypeRegistry};
use crate::route::Route;

/// Reply text sent when an inbound request cannot be decoded.
pub const INVALID_REQUEST_FORMAT: &str = "Invalid request format";

/// Message bus - maps routes to subjects, wraps payloads in envelopes and
/// hands the bytes to the transport.
///
/// ## Example
///
/// ```ignore
/// let bus = MessageBus::new(
///     InMemoryTransport::new(),
///     TypeRegistry::new().event::<InvoiceCreated>().request::<Ping>().response::<Pong>(),
/// );
///
/// bus.notify(&InvoiceCreated { invoice_id: "inv-1".into(), org_id })?;
///
/// let response = bus.request(&Ping {}, Duration::from_millis(50))?;
/// if let Some(error) = response.downcast_ref::<ErrorResponse>() {
///     // handler failed remotely
/// }
/// ```
pub struct MessageBus<T: Transport> {
    transport: Arc<T>,
    codec: Codec,
}

impl<T: Transport + 'static> MessageBus<T> {
    /// Create a bus that owns the given transport.
    pub fn new(transport: T, registry: TypeRegistry) -> Self {
        Self::with_codec(Arc::new(transport), Codec::new(registry))
    }

    /// Create a bus from a shared transport and codec.
    pub fn with_codec(transport: Arc<T>, codec: Codec) -> Self {
        Self { transport, codec }
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Publish a fire-and-forget event.
    pub fn notify<E: Event + ?Sized>(&self, event: &E) -> Result<(), BusError> {
        self.notify_in(&MessageContext::new(), event)
    }

    /// Publish an event carrying the tracing ids of `ctx`.
    pub fn notify_in<E: Event + ?Sized>(
        &self,
        ctx: &MessageContext,
        event: &E,
    ) -> Result<(), BusError> {
        let subject = event.route().publish_subject()?;

        let data = self.codec.encode(event).map_err(|err| {
            tracing::error!(subject = %subject, error = %err, "failed to serialize notification");
            err
        })?;

        let message = TransportMessage::new(subject.clone(), data).with_headers(ctx.to_headers());
        self.transport.publish(message).map_err(|err| {
            tracing::error!(subject = %subject, error = %err, "failed to publish notification");
            BusError::Transport(err)
        })
    }

    /// Send a request and block until its response or `timeout`.
    ///
    /// A remote handler failure is not an error here: it arrives as an
    /// `ErrorResponse`.
    pub fn request<R: Request + ?Sized>(
        &self,
        request: &R,
        timeout: Duration,
    ) -> Result<Box<dyn Response>, BusError> {
        self.request_in(&MessageContext::new(), request, timeout)
    }

    /// Send a request carrying the tracing ids of `ctx`.
    pub fn request_in<R: Request + ?Sized>(
        &self,
        ctx: &MessageContext,
        request: &R,
        timeout: Duration,
    ) -> Result<Box<dyn Response>, BusError> {
        let subject = request.route().publish_subject()?;

        let data = self.codec.encode(request).map_err(|err| {
            tracing::error!(subject = %subject, error = %err, "failed to serialize request");
            err
        })?;

        let message = TransportMessage::new(subject.clone(), data).with_headers(ctx.to_headers());
        let reply = self
            .transport
            .request(message, timeout)
            .map_err(|err| match err {
                TransportError::Timeout(_) => {
                    tracing::warn!(subject = %subject, ?timeout, "request timed out");
                    BusError::Timeout {
                        subject: subject.clone(),
                        timeout,
                    }
                }
                other => {
                    tracing::error!(subject = %subject, error = %other, "request failed");
                    BusError::Transport(other)
                }
            })?;

        self.codec.decode::<dyn Response>(&reply.data).map_err(|err| {
            tracing::error!(subject = %subject, error = %err, "failed to decode response");
            BusError::Codec(err)
        })
    }

    /// Bind an event handler to a route. Every subscriber receives every event.
    pub fn subscribe(&self, route: &Route, handler: EventHandler) -> Result<Subscription, BusError> {
        self.subscribe_with_options(route, handler, SubscriptionOpts::default())
    }

    /// Bind an event handler to a route, optionally inside a queue group.
    pub fn subscribe_with_options(
        &self,
        route: &Route,
        handler: EventHandler,
        opts: SubscriptionOpts,
    ) -> Result<Subscription, BusError> {
        let subject = route.subscribe_subject()?;
        let queue_group = opts.group();

        tracing::info!(subject = %subject, queue_group = ?queue_group, "subscribing to events");

        let codec = self.codec.clone();
        let callback: MessageCallback =
            Arc::new(move |message: TransportMessage| handle_event(&codec, &handler, message));

        let id = self
            .transport
            .subscribe(&subject, queue_group, callback)
            .map_err(|err| {
                tracing::error!(subject = %subject, error = %err, "failed to subscribe");
                BusError::Transport(err)
            })?;

        Ok(Subscription::new(id, route.clone(), subject, self.shared_transport()))
    }

    /// Bind a request handler to a route. Exactly one reply is sent for
    /// every inbound request.
    pub fn subscribe_request(
        &self,
        route: &Route,
        handler: RequestHandler,
    ) -> Result<Subscription, BusError> {
        let subject = route.subscribe_subject()?;

        tracing::info!(subject = %subject, "subscribing to requests");

        let codec = self.codec.clone();
        let transport: Weak<T> = Arc::downgrade(&self.transport);
        let callback: MessageCallback = Arc::new(move |message: TransportMessage| {
            if let Some(transport) = transport.upgrade() {
                handle_request(&codec, &*transport, &handler, message);
            }
        });

        let id = self
            .transport
            .subscribe(&subject, None, callback)
            .map_err(|err| {
                tracing::error!(subject = %subject, error = %err, "failed to subscribe to requests");
                BusError::Transport(err)
            })?;

        Ok(Subscription::new(id, route.clone(), subject, self.shared_transport()))
    }

    /// Remove a subscription.
    pub fn unsubscribe(&self, subscription: &Subscription) -> Result<(), BusError> {
        subscription.unsubscribe().map_err(|err| {
            tracing::warn!(subject = %subscription.subject(), error = %err, "failed to unsubscribe");
            BusError::Transport(err)
        })?;
        tracing::info!(subject = %subscription.subject(), "unsubscribed");
        Ok(())
    }

    /// Release the transport connection.
    pub fn close(&self) -> Result<(), BusError> {
        tracing::info!("closing transport connection");
        self.transport.close().map_err(BusError::Transport)
    }

    fn shared_transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }
}

#[cfg(feature = "tokio")]
impl<T: Transport + 'static> MessageBus<T> {
    /// Run `request` on the blocking pool so async callers are not stalled.
    pub async fn request_async<R: Request>(
        self: Arc<Self>,
        request: R,
        timeout: Duration,
    ) -> Result<Box<dyn Response>, BusError> {
        tokio::task::spawn_blocking(move || self.request(&request, timeout))
            .await
            .map_err(|err| BusError::Transport(TransportError::Other(Box::new(err))))?
    }
}

/// Decode, build the context, invoke. Undecodable events are logged and dropped.
fn handle_event(codec: &Codec, handler: &EventHandler, message: TransportMessage) {
    let event = match codec.decode::<dyn Event>(&message.data) {
        Ok(event) => event,
        Err(err) => {
            tracing::error!(subject = %message.subject, error = %err, "failed to deserialize event");
            return;
        }
    };

    let ctx = MessageContext::from_headers(message.subject.as_str(), &message.headers);
    let discriminator = event.discriminator();

    match panic::catch_unwind(AssertUnwindSafe(|| handler(&ctx, event))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(
            subject = %message.subject,
            discriminator,
            correlation_id = %ctx.correlation_id(),
            error = %err,
            "event handler error"
        ),
        Err(_) => tracing::error!(
            subject = %message.subject,
            discriminator,
            "event handler panicked"
        ),
    }
}

/// Decode, invoke, reply. Every path ends in exactly one `respond`.
fn handle_request<T: Transport + ?Sized>(
    codec: &Codec,
    transport: &T,
    handler: &RequestHandler,
    message: TransportMessage,
) {
    let response: Box<dyn Response> = match codec.decode::<dyn Request>(&message.data) {
        Err(err) => {
            tracing::error!(subject = %message.subject, error = %err, "failed to deserialize request");
            Box::new(ErrorResponse::new(INVALID_REQUEST_FORMAT))
        }
        Ok(request) => {
            let ctx = MessageContext::from_headers(message.subject.as_str(), &message.headers);
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&ctx, request))) {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    tracing::warn!(
                        subject = %message.subject,
                        correlation_id = %ctx.correlation_id(),
                        error = %err,
                        "request handler error"
                    );
                    Box::new(ErrorResponse::new(err.to_string()))
                }
                Err(_) => {
                    tracing::error!(subject = %message.subject, "request handler panicked");
                    Box::new(ErrorResponse::new("request handler panicked"))
                }
            }
        }
    };

    respond(codec, transport, &message, response.as_ref());
}

fn respond<T: Transport + ?Sized>(
    codec: &Codec,
    transport: &T,
    message: &TransportMessage,
    response: &dyn Response,
) {
    let data = match codec.encode(response) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(subject = %message.subject, error = %err, "failed to serialize response");
            match codec.encode(&ErrorResponse::new(err.to_string())) {
                Ok(data) => data,
                Err(err) => {
                    tracing::error!(subject = %message.subject, error = %err, "failed to serialize error response");
                    return;
                }
            }
        }
    };

    if let Err(err) = transport.respond(message, data) {
        tracing::warn!(subject = %message.subject, error = %err, "failed to send response");
    }
}
