//! Tracing context carried alongside every dispatched message.
//!
//! The context is passed explicitly to handlers; it never lives in
//! thread-local or global state. Correlation and causation ids travel as
//! message headers and fall back to the nil UUID when absent.

use uuid::Uuid;

/// Header carrying the correlation id.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";
/// Header carrying the causation id.
pub const CAUSATION_ID_HEADER: &str = "X-Causation-ID";

/// Message headers. Lookups ignore ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header by name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Add a header (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Request-scoped context handed to every handler.
///
/// ## Example
///
/// ```ignore
/// processor.on_event(|ctx: &MessageContext, event: InvoiceCreated| {
///     let (correlation_id, causation_id) = ctx.tracing();
///     bus.notify_in(ctx, &InvoiceMailed { invoice_id: event.invoice_id })?;
///     Ok(())
/// })?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageContext {
    correlation_id: Uuid,
    causation_id: Uuid,
    subject: Option<String>,
    headers: Headers,
}

impl MessageContext {
    /// Empty context: both ids are nil.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context carrying the given tracing ids.
    pub fn with_tracing(correlation_id: Uuid, causation_id: Uuid) -> Self {
        Self {
            correlation_id,
            causation_id,
            ..Self::default()
        }
    }

    /// Build a context from inbound message headers.
    ///
    /// Missing or unparsable ids become `Uuid::nil()`.
    pub fn from_headers(subject: impl Into<String>, headers: &Headers) -> Self {
        Self {
            correlation_id: parse_id(headers.get(CORRELATION_ID_HEADER)),
            causation_id: parse_id(headers.get(CAUSATION_ID_HEADER)),
            subject: Some(subject.into()),
            headers: headers.clone(),
        }
    }

    /// Headers that propagate this context onto an outbound message.
    ///
    /// Nil ids are omitted.
    pub fn to_headers(&self) -> Headers {
        let mut headers = Headers::new();
        if !self.correlation_id.is_nil() {
            headers.insert(CORRELATION_ID_HEADER, self.correlation_id.to_string());
        }
        if !self.causation_id.is_nil() {
            headers.insert(CAUSATION_ID_HEADER, self.causation_id.to_string());
        }
        headers
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn causation_id(&self) -> Uuid {
        self.causation_id
    }

    /// Get `(correlation_id, causation_id)`.
    pub fn tracing(&self) -> (Uuid, Uuid) {
        (self.correlation_id, self.causation_id)
    }

    /// Subject the message arrived on, if this context came from a delivery.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Raw inbound headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }
}

fn parse_id(value: Option<&str>) -> Uuid {
    value
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .unwrap_or_else(Uuid::nil)
}
