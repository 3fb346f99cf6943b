// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use futures::channel::mpsc::UnboundedSender;
use parking_lot::Mutex;
use testbus_api::BusError;
use testbus_api::BusResult;
use testbus_api::MatchOptions;
use testbus_api::ObjectPath;
use testbus_api::Signal;
use tracing::debug;

use crate::bus::BusInner;
use crate::object::TestBusObject;

pub(crate) struct ConnectionInner {
    bus: Arc<BusInner>,
    id: String,
    open: AtomicBool,
    // Signal subscriptions by `interface.member`
    pub(crate) matches: Mutex<HashMap<String, Vec<MatchOptions>>>,
    signals: Mutex<Vec<UnboundedSender<Signal>>>,
}

impl ConnectionInner {
    pub(crate) fn new(bus: Arc<BusInner>, id: String) -> Self {
        Self {
            bus,
            id,
            open: AtomicBool::new(true),
            matches: Mutex::new(HashMap::new()),
            signals: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Panics if the connection has been closed.
    pub(crate) fn check_open(&self) {
        if !self.is_open() {
            panic!("test bus connection {} is closed", self.id);
        }
    }

    /// Hands `signal` to this connection's sinks if any subscription matches.
    /// Returns true if the signal was delivered.
    pub(crate) fn deliver(&self, signal: &Signal, sender_names: &[String]) -> bool {
        if !self.is_open() {
            return false;
        }

        let matched = self.matches.lock().get(&signal.name).is_some_and(|entries| {
            entries.iter().any(|options| {
                options.matches(&signal.sender, sender_names, &signal.path, &signal.body)
            })
        });
        if !matched {
            return false;
        }

        let mut signals = self.signals.lock();
        signals.retain(|sink| sink.unbounded_send(signal.clone()).is_ok());
        true
    }
}

/// A client connection to the test bus.
#[derive(Clone)]
pub struct TestBusConnection {
    inner: Arc<ConnectionInner>,
}

impl TestBusConnection {
    pub(crate) fn from_inner(inner: Arc<ConnectionInner>) -> Self {
        Self { inner }
    }

    /// Unique id assigned by the bus
    pub fn id(&self) -> &str {
        self.inner.id()
    }

    /// The object at `path` of the service owning `destination`, bound to
    /// this connection so it can subscribe to signals.
    pub fn object(&self, destination: &str, path: &ObjectPath) -> BusResult<TestBusObject> {
        self.inner.check_open();
        let service = self
            .inner
            .bus
            .service(destination)
            .ok_or_else(|| BusError::ServiceUnknown(destination.to_string()))?;
        service.check_registered();
        Ok(TestBusObject::new(
            service.object_core(path),
            service,
            Some(self.inner.clone()),
        ))
    }

    /// Deliver signals matching this connection's subscriptions to `sink`.
    pub fn signal(&self, sink: UnboundedSender<Signal>) {
        self.inner.check_open();
        self.inner.signals.lock().push(sink);
    }

    /// Stop delivering signals to `sink`.
    pub fn remove_signal(&self, sink: &UnboundedSender<Signal>) {
        self.inner
            .signals
            .lock()
            .retain(|registered| !registered.same_receiver(sink));
    }

    /// Snapshot of the subscriptions registered under `interface.member`.
    pub fn matches(&self, name: &str) -> Vec<MatchOptions> {
        self.inner
            .matches
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Close the connection. Signal sinks are dropped and objects bound to the
    /// connection panic on further use.
    pub fn close(&self) {
        if self.inner.open.swap(false, Ordering::SeqCst) {
            self.inner.signals.lock().clear();
            debug!(id = self.inner.id(), "Connection closed on test bus");
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    /// Panics if the connection has been closed.
    pub fn check_open(&self) {
        self.inner.check_open();
    }
}
