//! In-memory transport for testing and single-process scenarios.
//!
//! This module provides a thread-safe in-memory transport that implements
//! `Transport` with the semantics a broker like NATS offers:
//! - Subject wildcards (`*` for one token, `>` for the tail)
//! - Queue groups (one member per message, round-robin)
//! - Request/reply through private inbox subjects
//! - One thread per delivery, so handlers run concurrently

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, RwLock};
use std::thread;
use std::time::Duration;

use uuid::Uuid;

use super::transport::{
    subject_matches, MessageCallback, SubscriptionId, Transport, TransportError, TransportMessage,
};

const INBOX_PREFIX: &str = "_INBOX.";

/// Published messages kept by `InMemoryTransport::new`.
pub const DEFAULT_LOG_CAPACITY: usize = 1024;

struct SubscriberEntry {
    id: SubscriptionId,
    pattern: String,
    queue_group: Option<String>,
    callback: MessageCallback,
}

struct Shared {
    subscribers: RwLock<Vec<SubscriberEntry>>,
    /// Pending request inboxes.
    inboxes: Mutex<HashMap<String, mpsc::Sender<TransportMessage>>>,
    /// Round-robin cursor per queue group.
    cursors: Mutex<HashMap<String, usize>>,
    /// Most recent published messages, oldest first.
    log: Mutex<VecDeque<TransportMessage>>,
    log_capacity: usize,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Shared {
    fn new(log_capacity: usize) -> Self {
        Self {
            subscribers: RwLock::default(),
            inboxes: Mutex::default(),
            cursors: Mutex::default(),
            log: Mutex::new(VecDeque::with_capacity(log_capacity.min(DEFAULT_LOG_CAPACITY))),
            log_capacity,
            next_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }
}

/// In-memory transport for testing and single-process scenarios.
///
/// Cloning shares the same "connection"; closing one clone closes all.
///
/// ## Example
///
/// ```
/// use std::sync::{mpsc, Arc};
/// use std::time::Duration;
/// use routed_messaging::bus::{InMemoryTransport, Transport, TransportMessage};
///
/// let transport = InMemoryTransport::new();
/// let (tx, rx) = mpsc::channel();
/// let tx = std::sync::Mutex::new(tx);
///
/// transport
///     .subscribe("global.orders.*", None, Arc::new(move |msg: TransportMessage| {
///         tx.lock().unwrap().send(msg.subject).unwrap();
///     }))
///     .unwrap();
///
/// transport
///     .publish(TransportMessage::new("global.orders.created", b"{}".to_vec()))
///     .unwrap();
///
/// let subject = rx.recv_timeout(Duration::from_secs(1)).unwrap();
/// assert_eq!(subject, "global.orders.created");
/// ```
#[derive(Clone)]
pub struct InMemoryTransport {
    shared: Arc<Shared>,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    /// Create a new in-memory transport that remembers the last
    /// `DEFAULT_LOG_CAPACITY` published messages.
    pub fn new() -> Self {
        Self::with_log_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Create a transport whose published log holds at most `capacity`
    /// messages. Zero turns recording off.
    pub fn with_log_capacity(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared::new(capacity)),
        }
    }

    /// Get the retained published messages, replies included, oldest first.
    pub fn published(&self) -> Vec<TransportMessage> {
        self.shared
            .log
            .lock()
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the subjects of all published messages, in order.
    pub fn published_subjects(&self) -> Vec<String> {
        self.published().into_iter().map(|m| m.subject).collect()
    }

    /// Find the first published message on a subject.
    pub fn find_by_subject(&self, subject: &str) -> Option<TransportMessage> {
        self.published().into_iter().find(|m| m.subject == subject)
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared
            .subscribers
            .read()
            .map(|subs| subs.len())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Clear the published log (useful for test cleanup).
    pub fn clear(&self) {
        if let Ok(mut log) = self.shared.log.lock() {
            log.clear();
        }
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    fn inboxes(&self) -> Result<MutexGuard<'_, HashMap<String, mpsc::Sender<TransportMessage>>>, TransportError> {
        self.shared
            .inboxes
            .lock()
            .map_err(|_| TransportError::LockPoisoned("inbox access"))
    }

    /// Pick the callbacks that receive a message on `subject`.
    ///
    /// Plain subscribers all receive it; each queue group contributes one
    /// member, chosen round-robin.
    fn recipients(&self, subject: &str) -> Result<Vec<MessageCallback>, TransportError> {
        let subscribers = self
            .shared
            .subscribers
            .read()
            .map_err(|_| TransportError::LockPoisoned("publish"))?;

        let mut recipients = Vec::new();
        let mut groups: HashMap<&str, Vec<&SubscriberEntry>> = HashMap::new();

        for entry in subscribers.iter().filter(|e| subject_matches(&e.pattern, subject)) {
            match entry.queue_group.as_deref() {
                Some(group) => groups.entry(group).or_default().push(entry),
                None => recipients.push(Arc::clone(&entry.callback)),
            }
        }

        if !groups.is_empty() {
            let mut cursors = self
                .shared
                .cursors
                .lock()
                .map_err(|_| TransportError::LockPoisoned("queue group selection"))?;
            for (group, members) in groups {
                let cursor = cursors.entry(group.to_string()).or_insert(0);
                let chosen = members[*cursor % members.len()];
                *cursor = cursor.wrapping_add(1);
                recipients.push(Arc::clone(&chosen.callback));
            }
        }

        Ok(recipients)
    }

    fn record(&self, message: &TransportMessage) -> Result<(), TransportError> {
        let capacity = self.shared.log_capacity;
        if capacity == 0 {
            return Ok(());
        }
        let mut log = self
            .shared
            .log
            .lock()
            .map_err(|_| TransportError::LockPoisoned("publish log"))?;
        while log.len() >= capacity {
            log.pop_front();
        }
        log.push_back(message.clone());
        Ok(())
    }
}

impl Transport for InMemoryTransport {
    fn publish(&self, message: TransportMessage) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.record(&message)?;

        if message.subject.starts_with(INBOX_PREFIX) {
            if let Some(inbox) = self.inboxes()?.get(&message.subject) {
                // The requester may have timed out already.
                let _ = inbox.send(message.clone());
            }
        }

        for callback in self.recipients(&message.subject)? {
            let delivery = message.clone();
            thread::spawn(move || callback(delivery));
        }
        Ok(())
    }

    fn request(
        &self,
        message: TransportMessage,
        timeout: Duration,
    ) -> Result<TransportMessage, TransportError> {
        self.ensure_open()?;

        let inbox = format!("{}{}", INBOX_PREFIX, Uuid::new_v4().simple());
        let (tx, rx) = mpsc::channel();
        self.inboxes()?.insert(inbox.clone(), tx);

        let outcome = self
            .publish(TransportMessage {
                reply: Some(inbox.clone()),
                ..message
            })
            .and_then(|()| {
                rx.recv_timeout(timeout).map_err(|err| match err {
                    mpsc::RecvTimeoutError::Timeout => TransportError::Timeout(timeout),
                    mpsc::RecvTimeoutError::Disconnected => TransportError::Closed,
                })
            });

        // Abandon the inbox; late replies are dropped.
        if let Ok(mut inboxes) = self.inboxes() {
            inboxes.remove(&inbox);
        }
        outcome
    }

    fn subscribe(
        &self,
        subject: &str,
        queue_group: Option<&str>,
        on_message: MessageCallback,
    ) -> Result<SubscriptionId, TransportError> {
        self.ensure_open()?;

        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.shared
            .subscribers
            .write()
            .map_err(|_| TransportError::LockPoisoned("subscribe"))?
            .push(SubscriberEntry {
                id,
                pattern: subject.to_string(),
                queue_group: queue_group.filter(|g| !g.is_empty()).map(str::to_string),
                callback: on_message,
            });
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), TransportError> {
        self.ensure_open()?;

        let mut subscribers = self
            .shared
            .subscribers
            .write()
            .map_err(|_| TransportError::LockPoisoned("unsubscribe"))?;
        let before = subscribers.len();
        subscribers.retain(|entry| entry.id != id);
        if subscribers.len() == before {
            return Err(TransportError::UnknownSubscription(id));
        }
        Ok(())
    }

    fn respond(&self, original: &TransportMessage, data: Vec<u8>) -> Result<(), TransportError> {
        let reply = original
            .reply
            .as_ref()
            .ok_or_else(|| TransportError::NoReplySubject(original.subject.clone()))?;
        self.publish(TransportMessage::new(reply.clone(), data))
    }

    fn close(&self) -> Result<(), TransportError> {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Ok(mut subscribers) = self.shared.subscribers.write() {
            subscribers.clear();
        }
        // Dropping the senders wakes pending requests.
        self.inboxes()?.clear();
        Ok(())
    }
}
