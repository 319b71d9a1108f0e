//! Property snapshots handed to callbacks, and language filtering.

use std::sync::{Arc, Mutex};
use svcbind_core::{
    Callbacks, NoopLifecycle, Properties, PropertySnapshot, SERVICE_ID, SERVICE_LANGUAGE,
};
use svcbind_registry::ServiceRegistry;

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn test_snapshot_is_detached_from_registration() {
    let registry = Arc::new(ServiceRegistry::new());
    let captured: Arc<Mutex<Vec<PropertySnapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();

    let mut dep = registry
        .context()
        .dependency::<u32>(Arc::new(NoopLifecycle), "Echo");
    dep.set_callbacks(Callbacks::on_set_with_properties(move |_svc: Option<u32>, snapshot: PropertySnapshot| {
        sink.lock().unwrap().push(snapshot);
    }));

    let reg = registry.register("Echo", 7_u32, props(&[("color", "red")]));
    registry
        .set_properties(reg.id(), props(&[("color", "blue")]))
        .unwrap();

    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].get("color"), Some("red"));
    assert_eq!(captured[0].get(SERVICE_ID), Some(reg.id().0.to_string().as_str()));
    assert_eq!(
        registry.properties_of(reg.id()).unwrap().get("color").map(String::as_str),
        Some("blue")
    );
}

#[test]
fn test_removal_callback_sees_properties() {
    let registry = Arc::new(ServiceRegistry::new());
    let removed: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = removed.clone();

    let mut dep = registry
        .context()
        .dependency::<u32>(Arc::new(NoopLifecycle), "Echo");
    dep.set_callbacks(Callbacks::on_add_remove_with_properties(
        |_svc: u32, _props: PropertySnapshot| {},
        move |_svc: u32, snapshot: PropertySnapshot| {
            sink.lock().unwrap().push(snapshot.get("color").map(str::to_string));
        },
    ));

    let reg = registry.register("Echo", 7_u32, props(&[("color", "red")]));
    registry.unregister(reg.id()).unwrap();

    assert_eq!(*removed.lock().unwrap(), vec![Some("red".to_string())]);
}

#[test]
fn test_language_filter_limits_matches() {
    let registry = Arc::new(ServiceRegistry::new());
    let _cxx = registry.register("Echo", 1_u32, props(&[(SERVICE_LANGUAGE, "cxx")]));
    let _rust = registry.register("Echo", 2_u32, props(&[(SERVICE_LANGUAGE, "rust"), ("fast", "yes")]));
    let _untagged = registry.register("Echo", 3_u32, Properties::new());

    let mut dep = registry
        .context()
        .dependency::<u32>(Arc::new(NoopLifecycle), "Echo");
    dep.set_callbacks(Callbacks::on_set(|_: Option<u32>| {}));
    assert_eq!(dep.tracked_count(), 3);

    dep.set_add_language_filter(true);
    assert_eq!(dep.composed_filter(), Some("(LANG=rust)"));
    assert_eq!(dep.tracked_count(), 1);
    assert_eq!(dep.current(), Some(2));

    dep.set_filter("(fast=yes)");
    assert_eq!(dep.composed_filter(), Some("(&(fast=yes)(LANG=rust))"));
    assert_eq!(dep.current(), Some(2));

    let info = registry.dependency_info(dep.handle().unwrap()).unwrap();
    assert!(info.add_language_filter);
    assert_eq!(info.spec.filter.as_deref(), Some("(&(fast=yes)(LANG=rust))"));
}

#[test]
fn test_dropping_dependency_destroys_it() {
    let registry = Arc::new(ServiceRegistry::new());
    let dep = registry
        .context()
        .dependency::<u32>(Arc::new(NoopLifecycle), "Echo");
    assert_eq!(registry.dependency_count(), 1);
    drop(dep);
    assert_eq!(registry.dependency_count(), 0);
}
