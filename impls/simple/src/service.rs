// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use parking_lot::Mutex;
use testbus_api::ObjectPath;
use testbus_api::Value;
use tracing::debug;

use crate::bus::BusInner;
use crate::object::ObjectCore;
use crate::object::TestBusObject;

pub(crate) struct ServiceInner {
    bus: Weak<BusInner>,
    name: String,
    id: String,
    call_delay: Duration,
    registered: AtomicBool,
    objects: Mutex<HashMap<ObjectPath, Arc<ObjectCore>>>,
}

impl ServiceInner {
    pub(crate) fn new(bus: Weak<BusInner>, name: String, id: String, call_delay: Duration) -> Self {
        Self {
            bus,
            name,
            id,
            call_delay,
            registered: AtomicBool::new(true),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn call_delay(&self) -> Duration {
        self.call_delay
    }

    pub(crate) fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    /// Panics if the service has been unregistered.
    pub(crate) fn check_registered(&self) {
        if !self.is_registered() {
            panic!(
                "test bus service {} ({}) is not registered",
                self.name, self.id
            );
        }
    }

    /// Shared state of the object at `path`, created on first use.
    pub(crate) fn object_core(&self, path: &ObjectPath) -> Arc<ObjectCore> {
        self.objects
            .lock()
            .entry(path.clone())
            .or_insert_with(|| Arc::new(ObjectCore::new(self.name.clone(), path.clone())))
            .clone()
    }

    pub(crate) fn emit(&self, name: &str, path: &ObjectPath, body: Vec<Value>) {
        // No bus means no connections left to deliver to.
        if let Some(bus) = self.bus.upgrade() {
            bus.emit(name, &self.id, path, body);
        }
    }

    fn unregister(&self) {
        if self.registered.swap(false, Ordering::SeqCst) {
            if let Some(bus) = self.bus.upgrade() {
                bus.release_name(&self.name, &self.id);
            }
            debug!(
                service = self.name,
                id = self.id,
                "Service unregistered from test bus"
            );
        }
    }
}

/// A named peer on the test bus that owns simulated objects.
#[derive(Clone)]
pub struct TestBusService {
    inner: Arc<ServiceInner>,
}

impl TestBusService {
    pub(crate) fn from_inner(inner: Arc<ServiceInner>) -> Self {
        Self { inner }
    }

    /// Well-known name the service was registered under
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Unique connection id assigned by the bus
    pub fn id(&self) -> &str {
        self.inner.id()
    }

    /// The object at `path`, not bound to any connection.
    /// Objects obtained for the same path share handlers and properties.
    pub fn object(&self, path: &ObjectPath) -> TestBusObject {
        self.inner.check_registered();
        TestBusObject::new(self.inner.object_core(path), self.inner.clone(), None)
    }

    /// Drop the service's name from the bus. Any later use of its objects panics.
    pub fn unregister(&self) {
        self.inner.unregister();
    }

    pub fn is_registered(&self) -> bool {
        self.inner.is_registered()
    }

    /// Panics if the service has been unregistered.
    pub fn check_registered(&self) {
        self.inner.check_registered();
    }
}
