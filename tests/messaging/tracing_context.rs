//! Correlation and causation ids across the wire.

use std::time::Duration;

use routed_messaging::{
    event_handler, request_handler, Headers, MessageContext, Route, Transport, TransportMessage,
    Uuid, CAUSATION_ID_HEADER, CORRELATION_ID_HEADER,
};

use crate::support::{self, drain, probe, JobQueued, Ping, Pong};

#[test]
fn notify_in_carries_tracing_headers() {
    let bus = support::bus();
    let (tx, rx) = probe::<(Uuid, Uuid)>();
    bus.subscribe(
        &Route::internal("jobs", "queued"),
        event_handler(move |ctx, _| {
            tx.lock().unwrap().send(ctx.tracing()).unwrap();
            Ok(())
        }),
    )
    .unwrap();

    let correlation = Uuid::new_v4();
    let causation = Uuid::new_v4();
    let ctx = MessageContext::with_tracing(correlation, causation);
    bus.notify_in(&ctx, &JobQueued { id: 3 }).unwrap();

    assert_eq!(drain(&rx), vec![(correlation, causation)]);

    let published = bus.transport().find_by_subject("internal.jobs.queued").unwrap();
    let expected = correlation.to_string();
    assert_eq!(
        published.headers.get(CORRELATION_ID_HEADER),
        Some(expected.as_str())
    );
}

#[test]
fn missing_or_invalid_headers_yield_nil_ids() {
    let bus = support::bus();
    let (tx, rx) = probe::<(Uuid, Uuid)>();
    bus.subscribe(
        &Route::internal("jobs", "queued"),
        event_handler(move |ctx, _| {
            tx.lock().unwrap().send(ctx.tracing()).unwrap();
            Ok(())
        }),
    )
    .unwrap();

    bus.notify(&JobQueued { id: 1 }).unwrap();

    let data = bus.codec().encode(&JobQueued { id: 2 }).unwrap();
    bus.transport()
        .publish(
            TransportMessage::new("internal.jobs.queued", data)
                .with_header(CORRELATION_ID_HEADER, "not-a-uuid")
                .with_header(CAUSATION_ID_HEADER, ""),
        )
        .unwrap();

    assert_eq!(drain(&rx), vec![(Uuid::nil(), Uuid::nil()); 2]);
}

#[test]
fn request_handler_sees_requester_context() {
    let bus = support::bus();
    let (tx, rx) = probe::<Uuid>();
    bus.subscribe_request(
        &Route::internal("health", "ping"),
        request_handler(move |ctx, _request| {
            tx.lock().unwrap().send(ctx.correlation_id()).unwrap();
            Ok(Box::new(Pong::default()))
        }),
    )
    .unwrap();

    let correlation = Uuid::new_v4();
    let ctx = MessageContext::from_headers(
        "internal.upstream.call",
        &Headers::new().with(CORRELATION_ID_HEADER, correlation.to_string()),
    );
    bus.request_in(&ctx, &Ping::default(), Duration::from_secs(1))
        .unwrap();

    assert_eq!(drain(&rx), vec![correlation]);
}
