//! Route to subject mapping end to end.

use std::time::Duration;

use routed_messaging::{event_handler, AddressError, BusError, Route};

use crate::support::{self, drain, org_id, probe, InvoiceCreated, ORG_ID};

#[test]
fn org_event_reaches_exact_and_wildcard_subscribers() {
    let bus = support::bus();
    let (tx, rx) = probe::<(&'static str, String)>();

    let exact_tx = tx.clone();
    let exact = bus
        .subscribe(
            &Route::org("billing", "invoice.created", Some(org_id())),
            event_handler(move |_ctx, event| {
                let invoice = event.downcast::<InvoiceCreated>().unwrap();
                exact_tx.lock().unwrap().send(("exact", invoice.invoice_id)).unwrap();
                Ok(())
            }),
        )
        .unwrap();

    let wildcard = bus
        .subscribe(
            &Route::org("billing", "invoice.created", None),
            event_handler(move |ctx, event| {
                let invoice = event.downcast::<InvoiceCreated>().unwrap();
                assert_eq!(
                    ctx.subject(),
                    Some(format!("org.{}.billing.invoice.created", ORG_ID).as_str())
                );
                tx.lock().unwrap().send(("wildcard", invoice.invoice_id)).unwrap();
                Ok(())
            }),
        )
        .unwrap();

    assert_eq!(
        exact.subject(),
        format!("org.{}.billing.invoice.created", ORG_ID)
    );
    assert_eq!(wildcard.subject(), "org.*.billing.invoice.created");

    bus.notify(&InvoiceCreated {
        org_id: Some(org_id()),
        invoice_id: "inv-1".into(),
    })
    .unwrap();

    let mut received = drain(&rx);
    received.sort();
    assert_eq!(
        received,
        vec![("exact", "inv-1".to_string()), ("wildcard", "inv-1".to_string())]
    );
}

#[test]
fn other_tenants_do_not_reach_exact_subscriber() {
    let bus = support::bus();
    let (tx, rx) = probe::<String>();

    bus.subscribe(
        &Route::org("billing", "invoice.created", Some(org_id())),
        event_handler(move |_ctx, event| {
            let invoice = event.downcast::<InvoiceCreated>().unwrap();
            tx.lock().unwrap().send(invoice.invoice_id).unwrap();
            Ok(())
        }),
    )
    .unwrap();

    bus.notify(&InvoiceCreated {
        org_id: Some(routed_messaging::Uuid::new_v4()),
        invoice_id: "inv-other".into(),
    })
    .unwrap();

    assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
}

#[test]
fn publishing_to_org_wildcard_is_rejected() {
    let bus = support::bus();
    let err = bus.notify(&InvoiceCreated::default()).unwrap_err();

    assert!(matches!(
        err,
        BusError::Address(AddressError::MissingOrganization(_))
    ));
    assert!(bus.transport().published().is_empty());
}

#[test]
fn undecodable_events_are_dropped() {
    use routed_messaging::{Transport, TransportMessage};

    let bus = support::bus();
    let (tx, rx) = probe::<()>();
    bus.subscribe(
        &Route::internal("jobs", "queued"),
        event_handler(move |_, _| {
            tx.lock().unwrap().send(()).unwrap();
            Ok(())
        }),
    )
    .unwrap();

    bus.transport()
        .publish(TransportMessage::new("internal.jobs.queued", b"not json".to_vec()))
        .unwrap();
    bus.transport()
        .publish(TransportMessage::new(
            "internal.jobs.queued",
            br#"{"discriminator":"jobs://unknown","content":{}}"#.to_vec(),
        ))
        .unwrap();

    assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
}
