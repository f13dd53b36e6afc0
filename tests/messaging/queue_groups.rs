//! Queue groups: one member per message, fan-out across groups.

use std::collections::HashMap;
use std::sync::Arc;

use routed_messaging::{event_handler, Processor, Route, SubscriptionOpts};

use crate::support::{self, drain, probe, JobQueued};

#[test]
fn each_message_goes_to_one_group_member() {
    let bus = support::bus();
    let (tx, rx) = probe::<(&'static str, u32)>();

    for worker in ["worker-a", "worker-b", "worker-c"] {
        let tx = tx.clone();
        bus.subscribe_with_options(
            &Route::internal("jobs", "queued"),
            event_handler(move |_ctx, event| {
                let job = event.downcast::<JobQueued>().unwrap();
                tx.lock().unwrap().send((worker, job.id)).unwrap();
                Ok(())
            }),
            SubscriptionOpts::queue_group("workers"),
        )
        .unwrap();
    }

    for id in 0..9 {
        bus.notify(&JobQueued { id }).unwrap();
    }

    let deliveries = drain(&rx);
    assert_eq!(deliveries.len(), 9);

    let mut ids: Vec<u32> = deliveries.iter().map(|(_, id)| *id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..9).collect::<Vec<_>>());

    let mut per_worker: HashMap<&str, usize> = HashMap::new();
    for (worker, _) in &deliveries {
        *per_worker.entry(*worker).or_default() += 1;
    }
    assert_eq!(per_worker.len(), 3);
    assert!(per_worker.values().all(|count| *count == 3));
}

#[test]
fn plain_subscribers_still_see_everything() {
    let bus = support::bus();
    let (tx, rx) = probe::<&'static str>();

    let audit_tx = tx.clone();
    bus.subscribe(
        &Route::internal("jobs", "queued"),
        event_handler(move |_, _| {
            audit_tx.lock().unwrap().send("audit").unwrap();
            Ok(())
        }),
    )
    .unwrap();

    for _ in 0..2 {
        let tx = tx.clone();
        bus.subscribe_with_options(
            &Route::internal("jobs", "queued"),
            event_handler(move |_, _| {
                tx.lock().unwrap().send("worker").unwrap();
                Ok(())
            }),
            SubscriptionOpts::queue_group("workers"),
        )
        .unwrap();
    }

    for id in 0..4 {
        bus.notify(&JobQueued { id }).unwrap();
    }

    let deliveries = drain(&rx);
    assert_eq!(deliveries.iter().filter(|d| **d == "audit").count(), 4);
    assert_eq!(deliveries.iter().filter(|d| **d == "worker").count(), 4);
}

#[test]
fn empty_queue_group_means_fan_out() {
    let bus = support::bus();
    let (tx, rx) = probe::<()>();

    for _ in 0..2 {
        let tx = tx.clone();
        bus.subscribe_with_options(
            &Route::internal("jobs", "queued"),
            event_handler(move |_, _| {
                tx.lock().unwrap().send(()).unwrap();
                Ok(())
            }),
            SubscriptionOpts::default(),
        )
        .unwrap();
    }

    bus.notify(&JobQueued { id: 1 }).unwrap();
    assert_eq!(drain(&rx).len(), 2);
}

#[test]
fn processor_queue_group_balances_replicas() {
    let bus = support::bus();
    let (tx, rx) = probe::<usize>();

    let replicas: Vec<Processor<_>> = (0..2)
        .map(|replica| {
            let processor = Processor::new(Arc::clone(&bus)).with_queue_group("jobs-service");
            let tx = tx.clone();
            processor
                .on_event(move |_ctx, _job: JobQueued| {
                    tx.lock().unwrap().send(replica).unwrap();
                    Ok(())
                })
                .unwrap();
            processor
        })
        .collect();

    for id in 0..4 {
        bus.notify(&JobQueued { id }).unwrap();
    }

    let deliveries = drain(&rx);
    assert_eq!(deliveries.len(), 4);
    assert_eq!(deliveries.iter().filter(|r| **r == 0).count(), 2);
    assert_eq!(replicas.len(), 2);
}
