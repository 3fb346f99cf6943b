// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use anyhow::Result;
use parking_lot::Mutex;
use testbus_api::ObjectPath;
use testbus_api::Signal;
use testbus_api::Value;
use testbus_api::validate_bus_name;
use tracing::debug;

use crate::config::TestBusConfig;
use crate::connection::ConnectionInner;
use crate::connection::TestBusConnection;
use crate::service::ServiceInner;
use crate::service::TestBusService;

/// Shared bus state: who owns which name, and who is listening.
pub(crate) struct BusInner {
    config: TestBusConfig,
    next_id: AtomicU64,
    // Registered services by well-known name
    services: Mutex<HashMap<String, Arc<ServiceInner>>>,
    connections: Mutex<Vec<Weak<ConnectionInner>>>,
}

impl BusInner {
    pub(crate) fn next_unique_id(&self) -> String {
        format!(":1.{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn service(&self, name: &str) -> Option<Arc<ServiceInner>> {
        let services = self.services.lock();
        services.get(name).cloned().or_else(|| {
            services
                .values()
                .find(|service| service.id() == name)
                .cloned()
        })
    }

    pub(crate) fn release_name(&self, name: &str, id: &str) {
        let mut services = self.services.lock();
        if services.get(name).is_some_and(|service| service.id() == id) {
            services.remove(name);
        }
    }

    fn names_owned_by(&self, id: &str) -> Vec<String> {
        self.services
            .lock()
            .iter()
            .filter(|(_, service)| service.id() == id)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Fans a signal out to every open connection with a matching subscription.
    pub(crate) fn emit(&self, name: &str, sender: &str, path: &ObjectPath, body: Vec<Value>) {
        let sender_names = self.names_owned_by(sender);
        let connections: Vec<Arc<ConnectionInner>> = {
            let mut connections = self.connections.lock();
            connections.retain(|conn| conn.upgrade().is_some_and(|conn| conn.is_open()));
            connections.iter().filter_map(Weak::upgrade).collect()
        };

        let signal = Signal {
            sender: sender.to_string(),
            path: path.clone(),
            name: name.to_string(),
            body,
        };

        let delivered = connections
            .iter()
            .filter(|conn| conn.deliver(&signal, &sender_names))
            .count();

        debug!(
            signal = name,
            sender = sender,
            path = %path,
            connections = connections.len(),
            delivered = delivered,
            "Signal emitted on test bus"
        );
    }
}

/// An in-process message bus.
///
/// Services register well-known names and expose objects; connections obtain
/// those objects, subscribe to signals and receive what services emit.
/// Handles are cheap to clone and share the same bus.
#[derive(Clone)]
pub struct TestBus {
    inner: Arc<BusInner>,
}

impl Default for TestBus {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBus {
    pub fn new() -> Self {
        Self::with_config(TestBusConfig::default())
    }

    pub fn with_config(config: TestBusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                config,
                next_id: AtomicU64::new(1),
                services: Mutex::new(HashMap::new()),
                connections: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &TestBusConfig {
        &self.inner.config
    }

    /// Register a service under a well-known name.
    /// Fails if the name is invalid or already owned.
    pub fn register_service(&self, name: &str) -> Result<TestBusService> {
        validate_bus_name(name)?;

        let mut services = self.inner.services.lock();
        if services.contains_key(name) {
            return Err(anyhow::anyhow!("Name already owned on test bus: {}", name));
        }

        let service = Arc::new(ServiceInner::new(
            Arc::downgrade(&self.inner),
            name.to_string(),
            self.inner.next_unique_id(),
            self.inner.config.call_delay,
        ));
        services.insert(name.to_string(), service.clone());

        debug!(
            service = name,
            id = service.id(),
            "Service registered on test bus"
        );

        Ok(TestBusService::from_inner(service))
    }

    /// Open a new client connection to the bus.
    pub fn connect(&self) -> TestBusConnection {
        let conn = Arc::new(ConnectionInner::new(
            self.inner.clone(),
            self.inner.next_unique_id(),
        ));
        self.inner.connections.lock().push(Arc::downgrade(&conn));

        debug!(id = conn.id(), "Connection opened on test bus");

        TestBusConnection::from_inner(conn)
    }

    /// Unique id of the registered service owning `name`.
    pub fn owner_of(&self, name: &str) -> Option<String> {
        self.inner
            .service(name)
            .map(|service| service.id().to_string())
    }

    /// The registered service owning `name`.
    pub fn service(&self, name: &str) -> Option<TestBusService> {
        self.inner.service(name).map(TestBusService::from_inner)
    }
}
