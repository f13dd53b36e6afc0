//! Test payloads: a billing domain plus a health check.

use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use routed_messaging::{
    Discriminated, Event, InMemoryTransport, MessageBus, Request, Response, Route, TypeRegistry,
    Uuid,
};
use serde::{Deserialize, Serialize};

pub const ORG_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

pub fn org_id() -> Uuid {
    Uuid::parse_str(ORG_ID).unwrap()
}

/// Org-scoped event. Without an organization the route is the wildcard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub org_id: Option<Uuid>,
    pub invoice_id: String,
}

impl Discriminated for InvoiceCreated {
    const DISCRIMINATOR: &'static str = "billing://invoice-created";
}

impl Event for InvoiceCreated {
    fn route(&self) -> Route {
        Route::org("billing", "invoice.created", self.org_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobQueued {
    pub id: u32,
}

impl Discriminated for JobQueued {
    const DISCRIMINATOR: &'static str = "jobs://queued";
}

impl Event for JobQueued {
    fn route(&self) -> Route {
        Route::internal("jobs", "queued")
    }
}

/// Shares its discriminator with `StartJob`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStarted {
    pub id: u32,
}

impl Discriminated for JobStarted {
    const DISCRIMINATOR: &'static str = "jobs://started";
}

impl Event for JobStarted {
    fn route(&self) -> Route {
        Route::internal("jobs", "started")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartJob {
    pub id: u32,
}

impl Discriminated for StartJob {
    const DISCRIMINATOR: &'static str = "jobs://started";
}

impl Request for StartJob {
    fn route(&self) -> Route {
        Route::internal("jobs", "start")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    pub seq: u32,
}

impl Discriminated for Ping {
    const DISCRIMINATOR: &'static str = "health://ping";
}

impl Request for Ping {
    fn route(&self) -> Route {
        Route::internal("health", "ping")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pong {
    pub seq: u32,
}

impl Discriminated for Pong {
    const DISCRIMINATOR: &'static str = "health://pong";
}

impl Response for Pong {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Divide {
    pub dividend: i64,
    pub divisor: i64,
}

impl Discriminated for Divide {
    const DISCRIMINATOR: &'static str = "math://divide";
}

impl Request for Divide {
    fn route(&self) -> Route {
        Route::global("math", "divide")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quotient {
    pub value: i64,
}

impl Discriminated for Quotient {
    const DISCRIMINATOR: &'static str = "math://quotient";
}

impl Response for Quotient {}

pub fn registry() -> TypeRegistry {
    TypeRegistry::new()
        .event::<InvoiceCreated>()
        .event::<JobQueued>()
        .event::<JobStarted>()
        .request::<Ping>()
        .request::<StartJob>()
        .request::<Divide>()
        .response::<Pong>()
        .response::<Quotient>()
}

pub fn bus() -> Arc<MessageBus<InMemoryTransport>> {
    Arc::new(MessageBus::new(InMemoryTransport::new(), registry()))
}

/// Thread-safe probe handed to handlers.
pub fn probe<T: Send + 'static>() -> (Arc<Mutex<mpsc::Sender<T>>>, Receiver<T>) {
    let (tx, rx) = mpsc::channel();
    (Arc::new(Mutex::new(tx)), rx)
}

/// Collect whatever arrives until the channel stays quiet.
pub fn drain<T>(rx: &Receiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = rx.recv_timeout(Duration::from_millis(150)) {
        items.push(item);
    }
    items
}
