//! Subscription handles returned by the bus.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::transport::{SubscriptionId, Transport, TransportError};
use crate::route::Route;

/// Options for event subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionOpts {
    /// Load-balance deliveries across all subscribers sharing this group.
    /// Empty means every subscriber receives every message.
    pub queue_group: String,
}

impl SubscriptionOpts {
    pub fn queue_group(group: impl Into<String>) -> Self {
        Self {
            queue_group: group.into(),
        }
    }

    pub(crate) fn group(&self) -> Option<&str> {
        Some(self.queue_group.as_str()).filter(|g| !g.is_empty())
    }
}

/// Handle bound to one route and one handler.
///
/// Holds a reference to the transport subscription it wraps, not to the
/// bus. The first `unsubscribe` moves it to the terminal state; what a
/// second call does is up to the transport.
pub struct Subscription {
    id: SubscriptionId,
    route: Route,
    subject: String,
    transport: Arc<dyn Transport>,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        route: Route,
        subject: String,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            id,
            route,
            subject,
            transport,
            active: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Subject the transport subscription listens on.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Remove the subscription from the transport.
    pub fn unsubscribe(&self) -> Result<(), TransportError> {
        self.transport.unsubscribe(self.id)?;
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("subject", &self.subject)
            .field("active", &self.is_active())
            .finish()
    }
}
