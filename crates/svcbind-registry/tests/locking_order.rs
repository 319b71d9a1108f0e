//! Concurrency tests for Locking dependencies bound to the registry.
//!
//! Producers register and unregister providers from many threads; the
//! callbacks of one dependency must run one at a time and in exactly the
//! order the registry queued the events for it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use svcbind_core::{
    Callbacks, DependencyHandle, NoopLifecycle, Properties, RebindStrategy, ServiceEvent,
    ServiceEventKind,
};
use svcbind_registry::{EventTap, ServiceRegistry};

const PRODUCERS: u64 = 8;
const ROUNDS: u64 = 70;
const WINDOW: usize = 3;

type Log = Arc<Mutex<Vec<(DependencyHandle, ServiceEventKind, u64)>>>;

fn tapped_registry() -> (Arc<ServiceRegistry>, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let tap: EventTap = Arc::new(move |handle: DependencyHandle, event: &ServiceEvent| {
        let token = event.provider_as::<u64>().unwrap_or(u64::MAX);
        sink.lock().unwrap().push((handle, event.kind, token));
    });
    (Arc::new(ServiceRegistry::new().with_event_tap(tap)), log)
}

/// Each producer keeps a small window of live registrations, so adds and
/// removes from different threads interleave.
fn run_producers(registry: &Arc<ServiceRegistry>) {
    let barrier = Arc::new(Barrier::new(PRODUCERS as usize));
    let workers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let mut live = VecDeque::new();
                for round in 0..ROUNDS {
                    let token = producer * 1_000 + round;
                    let reg = registry.register("Echo", token, Properties::new());
                    live.push_back(reg.id());
                    if live.len() > WINDOW {
                        let oldest = live.pop_front().unwrap();
                        registry.unregister(oldest).unwrap();
                    }
                }
                for id in live {
                    registry.unregister(id).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn test_locking_callbacks_follow_delivery_order() {
    let (registry, log) = tapped_registry();
    let ctx = registry.context();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let busy = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));
    let (add_calls, add_busy, add_overlap) = (calls.clone(), busy.clone(), overlapped.clone());
    let (remove_calls, remove_busy, remove_overlap) =
        (calls.clone(), busy.clone(), overlapped.clone());

    let mut dep = ctx.dependency::<u64>(Arc::new(NoopLifecycle), "Echo");
    dep.set_strategy(RebindStrategy::Locking)
        .set_callbacks(Callbacks::on_add_remove(
            move |token: u64| {
                if add_busy.swap(true, Ordering::SeqCst) {
                    add_overlap.store(true, Ordering::SeqCst);
                }
                add_calls.lock().unwrap().push((ServiceEventKind::Added, token));
                add_busy.store(false, Ordering::SeqCst);
            },
            move |token: u64| {
                if remove_busy.swap(true, Ordering::SeqCst) {
                    remove_overlap.store(true, Ordering::SeqCst);
                }
                remove_calls.lock().unwrap().push((ServiceEventKind::Removed, token));
                remove_busy.store(false, Ordering::SeqCst);
            },
        ));
    let handle = dep.handle().unwrap();

    run_producers(&registry);

    let queued: Vec<_> = log
        .lock()
        .unwrap()
        .iter()
        .filter(|(h, _, _)| *h == handle)
        .map(|(_, kind, token)| (*kind, *token))
        .collect();
    let invoked = calls.lock().unwrap().clone();

    assert!(queued.len() >= 1_000, "only {} events", queued.len());
    assert_eq!(queued.len(), (PRODUCERS * ROUNDS * 2) as usize);
    assert_eq!(invoked, queued);
    assert!(!overlapped.load(Ordering::SeqCst), "callbacks overlapped");
    assert_eq!(dep.tracked_count(), 0);
    assert_eq!(dep.current(), None);
}

#[test]
fn test_independent_dependencies_each_see_their_own_order() {
    let (registry, log) = tapped_registry();
    let ctx = registry.context();

    let mut recorded = Vec::new();
    let mut deps = Vec::new();
    for _ in 0..3 {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (add_calls, remove_calls) = (calls.clone(), calls.clone());
        let mut dep = ctx.dependency::<u64>(Arc::new(NoopLifecycle), "Echo");
        dep.set_strategy(RebindStrategy::Locking)
            .set_callbacks(Callbacks::on_add_remove(
                move |token: u64| add_calls.lock().unwrap().push((ServiceEventKind::Added, token)),
                move |token: u64| remove_calls.lock().unwrap().push((ServiceEventKind::Removed, token)),
            ));
        recorded.push((dep.handle().unwrap(), calls));
        deps.push(dep);
    }

    run_producers(&registry);

    let log = log.lock().unwrap();
    for (handle, calls) in recorded {
        let queued: Vec<_> = log
            .iter()
            .filter(|(h, _, _)| *h == handle)
            .map(|(_, kind, token)| (*kind, *token))
            .collect();
        assert_eq!(*calls.lock().unwrap(), queued);
    }
}
