//! Processor registration and dispatch.

use std::sync::Arc;
use std::time::Duration;

use routed_messaging::{
    Accepted, ErrorResponse, HandlerError, MessageBus, Namespace, Processor, RegistrationError,
    TypeRegistry,
};

use crate::support::{
    self, drain, org_id, probe, Divide, InvoiceCreated, JobQueued, JobStarted, Ping, Pong,
    Quotient, StartJob,
};

#[test]
fn typed_handlers_receive_concrete_payloads() {
    let processor = Processor::new(support::bus());
    let (tx, rx) = probe::<String>();

    processor
        .on_event(move |_ctx, invoice: InvoiceCreated| {
            tx.lock().unwrap().send(invoice.invoice_id).unwrap();
            Ok(())
        })
        .unwrap();
    processor
        .on_request(|_ctx, ping: Ping| Ok(Pong { seq: ping.seq * 2 }))
        .unwrap();

    processor
        .bus()
        .notify(&InvoiceCreated {
            org_id: Some(org_id()),
            invoice_id: "inv-7".into(),
        })
        .unwrap();
    assert_eq!(drain(&rx), vec!["inv-7".to_string()]);

    let response = processor
        .bus()
        .request(&Ping { seq: 21 }, Duration::from_secs(1))
        .unwrap();
    assert_eq!(response.downcast_ref::<Pong>(), Some(&Pong { seq: 42 }));
}

#[test]
fn second_registration_conflicts_and_first_keeps_working() {
    let processor = Processor::new(support::bus());

    processor
        .on_request(|_ctx, ping: Ping| Ok(Pong { seq: ping.seq }))
        .unwrap();
    let err = processor
        .on_request(|_ctx, _ping: Ping| Ok(Accepted::default()))
        .unwrap_err();

    assert!(err.is_conflict());
    assert!(matches!(
        err,
        RegistrationError::Conflict {
            namespace: Namespace::Request,
            discriminator: "health://ping",
        }
    ));
    assert_eq!(processor.request_discriminators(), vec!["health://ping"]);

    let response = processor
        .bus()
        .request(&Ping { seq: 5 }, Duration::from_secs(1))
        .unwrap();
    assert_eq!(response.downcast_ref::<Pong>(), Some(&Pong { seq: 5 }));
}

#[test]
fn event_and_request_may_share_a_discriminator() {
    let processor = Processor::new(support::bus());
    let (tx, rx) = probe::<u32>();

    processor
        .on_event(move |_ctx, started: JobStarted| {
            tx.lock().unwrap().send(started.id).unwrap();
            Ok(())
        })
        .unwrap();
    processor
        .on_request(|_ctx, start: StartJob| Ok(Quotient { value: start.id.into() }))
        .unwrap();

    processor.bus().notify(&JobStarted { id: 8 }).unwrap();
    assert_eq!(drain(&rx), vec![8]);

    let response = processor
        .bus()
        .request(&StartJob { id: 9 }, Duration::from_secs(1))
        .unwrap();
    assert_eq!(response.downcast_ref::<Quotient>(), Some(&Quotient { value: 9 }));
}

#[test]
fn handler_errors_reach_the_requester() {
    let processor = Processor::new(support::bus());
    processor
        .on_request(|_ctx, divide: Divide| {
            if divide.divisor == 0 {
                return Err(HandlerError::Rejected("divisor must not be zero".into()));
            }
            Ok(Quotient {
                value: divide.dividend / divide.divisor,
            })
        })
        .unwrap();

    let response = processor
        .bus()
        .request(
            &Divide {
                dividend: 1,
                divisor: 0,
            },
            Duration::from_secs(1),
        )
        .unwrap();
    let error = response.downcast_ref::<ErrorResponse>().unwrap();
    assert!(error.error.contains("divisor must not be zero"));
}

#[test]
fn registration_fails_after_close() {
    let processor = Processor::new(support::bus());
    processor.bus().close().unwrap();

    let err = processor
        .on_event(|_ctx, _job: JobQueued| Ok(()))
        .unwrap_err();
    assert!(matches!(err, RegistrationError::Subscribe { .. }));
    assert!(!processor.is_registered(Namespace::Event, "jobs://queued"));
}

#[test]
fn shutdown_stops_dispatch() {
    let processor = Processor::new(support::bus());
    let (tx, rx) = probe::<u32>();
    processor
        .on_event(move |_ctx, job: JobQueued| {
            tx.lock().unwrap().send(job.id).unwrap();
            Ok(())
        })
        .unwrap();

    processor.shutdown().unwrap();
    processor.bus().notify(&JobQueued { id: 1 }).unwrap();

    assert!(drain(&rx).is_empty());
    assert!(processor.event_discriminators().is_empty());
}

#[test]
fn processors_share_a_bus() {
    let bus = Arc::new(MessageBus::new(
        routed_messaging::InMemoryTransport::new(),
        TypeRegistry::new().event::<JobQueued>(),
    ));
    let first = Processor::new(bus.clone());
    let second = Processor::new(bus.clone());

    first.on_event(|_ctx, _job: JobQueued| Ok(())).unwrap();
    second.on_event(|_ctx, _job: JobQueued| Ok(())).unwrap();

    assert_eq!(bus.transport().subscriber_count(), 2);
}
