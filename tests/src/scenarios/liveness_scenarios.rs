// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

//! Misuse of a dead fixture. Every `run_test_*_panics` scenario is expected
//! to panic rather than return.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use futures::channel::mpsc::unbounded;
use testbus_api::BusError;
use testbus_api::Flags;
use testbus_api::Value;
use testbus_simple::GO_CALL_DELAY;

use crate::common::helpers::drain_signals;
use crate::fixtures::BoundObjectFixture;
use crate::fixtures::BusObjectTestFixture;

pub async fn run_test_call_after_unregister_panics<F: BusObjectTestFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    let object = fixture.create_object();
    object.on(".Ping", |_| Ok(vec![]));
    fixture.service().unregister();
    assert!(!fixture.service().is_registered());

    let _ = object.call(".Ping", Flags::NONE, vec![]);
    Ok(())
}

pub async fn run_test_get_property_after_unregister_panics<F: BusObjectTestFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    let object = fixture.create_object();
    object.set_property(".Ready", true, false);
    fixture.service().unregister();

    let _ = object.get_property(".Ready");
    Ok(())
}

pub async fn run_test_path_after_unregister_panics<F: BusObjectTestFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    let object = fixture.create_object();
    fixture.service().unregister();

    let _ = object.path();
    Ok(())
}

pub async fn run_test_go_after_unregister_panics<F: BusObjectTestFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    let object = fixture.create_object();
    object.on(".Ping", |_| Ok(vec![]));
    fixture.service().unregister();

    let (done_tx, _done_rx) = unbounded();
    let _ = object.go(".Ping", Flags::NONE, done_tx, vec![]);
    Ok(())
}

pub async fn run_test_go_after_close_panics<F: BoundObjectFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    let object = fixture.create_object();
    object.on(".Ping", |_| Ok(vec![]));
    fixture.client().close();

    let (done_tx, _done_rx) = unbounded();
    let _ = object.go(".Ping", Flags::NONE, done_tx, vec![]);
    Ok(())
}

pub async fn run_test_call_after_close_panics<F: BoundObjectFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    let object = fixture.create_object();
    object.on(".Ping", |_| Ok(vec![]));
    fixture.client().close();

    let _ = object.call(".Ping", Flags::NONE, vec![]);
    Ok(())
}

pub async fn run_test_match_without_connection_panics<F: BusObjectTestFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    // Objects taken straight from the service have no connection to subscribe on.
    let object = fixture.service().object(fixture.path());

    let _ = object.add_match_signal("org.example.Network", "LinkChanged", &[]);
    Ok(())
}

pub async fn run_test_setup_after_unregister<F: BusObjectTestFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    let object = fixture.create_object();
    let invoked = Arc::new(AtomicBool::new(false));
    fixture.service().unregister();

    // Installing handlers and emitting are not liveness-checked.
    let flag = invoked.clone();
    object.on(".Late", move |_| {
        flag.store(true, Ordering::SeqCst);
        Ok(vec![])
    });
    object.emit(".Gone", vec![Value::from("bye")]);

    // The name is free again and a fresh registration gets fresh objects.
    let service = fixture.bus().register_service(fixture.service().name())?;
    assert_ne!(service.id(), fixture.service().id());
    let fresh = service.object(fixture.path());
    assert_eq!(
        fresh.call(".Late", Flags::NONE, vec![]).err(),
        Some(&BusError::NoSuchMethod(format!("{}.Late", service.name())))
    );
    assert!(!invoked.load(Ordering::SeqCst));

    Ok(())
}

pub async fn run_test_bus_registry<F: BusObjectTestFixture>(
    fixture: &F,
) -> anyhow::Result<()> {
    let missing = "org.example.Nobody";
    let result = fixture.connection().object(missing, fixture.path());
    assert_eq!(
        result.err(),
        Some(BusError::ServiceUnknown(missing.to_string()))
    );

    // Unique ids resolve like well-known names.
    let by_id = fixture
        .connection()
        .object(fixture.service().id(), fixture.path())?;
    assert_eq!(by_id.destination(), fixture.service().name());

    assert_eq!(
        fixture.bus().owner_of(fixture.service().name()).as_deref(),
        Some(fixture.service().id())
    );
    assert!(fixture.bus().register_service(fixture.service().name()).is_err());
    assert!(fixture.bus().register_service("not-a-bus-name").is_err());

    let service = fixture
        .bus()
        .service(fixture.service().name())
        .ok_or_else(|| anyhow::anyhow!("Registered service should be found by name"))?;
    assert_eq!(service.id(), fixture.service().id());
    assert!(fixture.bus().service(missing).is_none());
    assert_eq!(fixture.bus().config().call_delay, GO_CALL_DELAY);

    // A removed sink stops receiving while the remaining one still does.
    let watcher = fixture
        .connection()
        .object(fixture.service().name(), fixture.path())?;
    assert!(watcher.add_match_signal("org.example.Registry", "Ping", &[]).is_ok());
    let (removed_tx, mut removed_rx) = unbounded();
    let (kept_tx, mut kept_rx) = unbounded();
    fixture.connection().signal(removed_tx.clone());
    fixture.connection().signal(kept_tx);
    fixture.connection().remove_signal(&removed_tx);

    fixture
        .create_object()
        .emit("org.example.Registry.Ping", vec![Value::from("hello")]);

    assert!(
        drain_signals(&mut removed_rx).is_empty(),
        "A removed sink should not receive signals"
    );
    let delivered = drain_signals(&mut kept_rx);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].name, "org.example.Registry.Ping");

    Ok(())
}
