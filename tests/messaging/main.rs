//! Messaging integration tests over the in-memory transport.

mod support;
mod addressing;
mod processor;
mod queue_groups;
mod tracing_context;
