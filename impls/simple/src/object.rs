// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use futures::channel::mpsc::UnboundedSender;
use parking_lot::Mutex;
use testbus_api::BusError;
use testbus_api::BusObject;
use testbus_api::BusResult;
use testbus_api::Call;
use testbus_api::CallContext;
use testbus_api::Flags;
use testbus_api::MatchOption;
use testbus_api::ObjectPath;
use testbus_api::Value;
use testbus_api::Variant;
use testbus_api::expand;
use testbus_api::match_option_map;
use testbus_api::names::BUS_NAME;
use testbus_api::names::PROPERTIES_CHANGED;
use testbus_api::names::bus_path;
use tracing::debug;
use tracing::warn;

use crate::connection::ConnectionInner;
use crate::service::ServiceInner;

/// Behaviour installed for a method with `TestBusObject::on`.
pub type MethodHandler = Arc<dyn Fn(&[Value]) -> BusResult<Vec<Value>> + Send + Sync>;

#[derive(Default)]
struct ObjectState {
    props: HashMap<String, Value>,
    calls: HashMap<String, MethodHandler>,
}

/// State shared by every handle to the same object.
pub(crate) struct ObjectCore {
    destination: String,
    path: ObjectPath,
    state: Mutex<ObjectState>,
}

impl ObjectCore {
    pub(crate) fn new(destination: String, path: ObjectPath) -> Self {
        Self {
            destination,
            path,
            state: Mutex::new(ObjectState::default()),
        }
    }
}

/// A simulated remote object.
///
/// Test code installs method handlers with `on` and seeds properties with
/// `set_property`; code under test then talks to it through `BusObject`
/// exactly as it would talk to a real proxy. Every operation resolves
/// in-process.
///
/// Using an object after its service was unregistered, or after the
/// connection it was obtained from was closed, panics.
#[derive(Clone)]
pub struct TestBusObject {
    core: Arc<ObjectCore>,
    service: Arc<ServiceInner>,
    conn: Option<Arc<ConnectionInner>>,
}

impl TestBusObject {
    pub(crate) fn new(
        core: Arc<ObjectCore>,
        service: Arc<ServiceInner>,
        conn: Option<Arc<ConnectionInner>>,
    ) -> Self {
        Self {
            core,
            service,
            conn,
        }
    }

    /// Calls a method and waits for its reply.
    pub fn call(&self, method: &str, flags: Flags, args: Vec<Value>) -> Call {
        self.check();
        let method = expand(&self.core.destination, method);

        // The handler runs unlocked so it may touch this object's properties.
        let handler = self.core.state.lock().calls.get(&method).cloned();
        let result = match handler {
            Some(handler) => handler(&args),
            None => {
                warn!(
                    destination = self.core.destination,
                    path = %self.core.path,
                    method = method,
                    "No handler installed for method"
                );
                Err(BusError::NoSuchMethod(method.clone()))
            }
        };

        debug!(
            destination = self.core.destination,
            path = %self.core.path,
            method = method,
            flags = flags.bits(),
            args = args.len(),
            ok = result.is_ok(),
            "Call on test bus object"
        );

        Call {
            destination: self.core.destination.clone(),
            path: self.core.path.clone(),
            method,
            args,
            result,
        }
    }

    /// Same as `call`; the context is accepted but never honored.
    pub fn call_with_context(
        &self,
        _ctx: &CallContext,
        method: &str,
        flags: Flags,
        args: Vec<Value>,
    ) -> Call {
        self.call(method, flags, args)
    }

    /// Performs `call` on a spawned task after the bus's call delay and sends
    /// the completed call on `done`. Never blocks and always returns `None`.
    ///
    /// Liveness is checked in the caller, so a dead object panics here rather
    /// than inside the spawned task. Must be invoked from within a tokio
    /// runtime.
    pub fn go(
        &self,
        method: &str,
        flags: Flags,
        done: UnboundedSender<Call>,
        args: Vec<Value>,
    ) -> Option<Call> {
        self.check();
        let object = self.clone();
        let method = method.to_string();
        let delay = self.service.call_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let call = object.call(&method, flags, args);
            if done.unbounded_send(call).is_err() {
                debug!(method = method, "Caller dropped the completion channel");
            }
        });
        None
    }

    /// Same as `go`; the context is accepted but never honored.
    pub fn go_with_context(
        &self,
        _ctx: &CallContext,
        method: &str,
        flags: Flags,
        done: UnboundedSender<Call>,
        args: Vec<Value>,
    ) -> Option<Call> {
        self.go(method, flags, done, args)
    }

    /// Subscribes the owning connection to `iface.member` signals filtered by
    /// `options`. Only `path`, `path_namespace`, `sender` and `arg*` filters are
    /// supported; anything else fails without touching the match table.
    pub fn add_match_signal(&self, iface: &str, member: &str, options: &[MatchOption]) -> Call {
        let name = format!("{}.{}", iface, member);
        self.check();
        let conn = self.connection();
        let options = match_option_map(options);
        let rule = options.rule(iface, member);

        if let Some(key) = options.first_unsupported_key() {
            warn!(signal = name, key = key, "Unsupported match type");
            return match_call_result(
                "AddMatch",
                rule,
                Err(BusError::UnsupportedMatchType(key.to_string())),
            );
        }

        conn.matches.lock().entry(name.clone()).or_default().push(options);

        debug!(connection = conn.id(), signal = name, rule = rule, "Match added");
        match_call_result("AddMatch", rule, Ok(()))
    }

    /// Removes the first subscription for `iface.member` whose options equal
    /// `options`.
    pub fn remove_match_signal(
        &self,
        iface: &str,
        member: &str,
        options: &[MatchOption],
    ) -> Call {
        let name = format!("{}.{}", iface, member);
        self.check();
        let conn = self.connection();
        let options = match_option_map(options);
        let rule = options.rule(iface, member);

        let removed = {
            let mut matches = conn.matches.lock();
            let removed = match matches.get_mut(&name) {
                Some(entries) => match entries.iter().position(|m| *m == options) {
                    Some(index) => {
                        entries.remove(index);
                        true
                    }
                    None => false,
                },
                None => false,
            };
            if matches.get(&name).is_some_and(Vec::is_empty) {
                matches.remove(&name);
            }
            removed
        };

        if !removed {
            return match_call_result("RemoveMatch", rule, Err(BusError::MatchNotFound));
        }

        debug!(connection = conn.id(), signal = name, rule = rule, "Match removed");
        match_call_result("RemoveMatch", rule, Ok(()))
    }

    /// Returns the value of a named property, wrapped in a variant.
    pub fn get_property(&self, name: &str) -> BusResult<Variant> {
        self.check();
        let name = expand(&self.core.destination, name);
        let state = self.core.state.lock();
        match state.props.get(&name) {
            Some(value) => Ok(Variant::new(value.clone())),
            None => Err(BusError::NoSuchProperty(name)),
        }
    }

    /// Destination that calls are sent to.
    pub fn destination(&self) -> String {
        self.check();
        self.core.destination.clone()
    }

    /// Path that calls are sent to.
    pub fn path(&self) -> ObjectPath {
        self.check();
        self.core.path.clone()
    }

    /// Sets a property. If `emit_signal` is set, a PropertiesChanged signal
    /// carrying only this property follows the write.
    pub fn set_property(&self, name: &str, value: impl Into<Value>, emit_signal: bool) {
        self.check();
        let name = expand(&self.core.destination, name);
        let value = value.into();
        self.core
            .state
            .lock()
            .props
            .insert(name.clone(), value.clone());

        debug!(
            destination = self.core.destination,
            path = %self.core.path,
            property = name,
            signal = emit_signal,
            "Property set"
        );

        if emit_signal {
            let mut changed = BTreeMap::new();
            changed.insert(name, Value::from(Variant::new(value)));
            self.emit(
                PROPERTIES_CHANGED,
                vec![
                    Value::from(self.core.destination.clone()),
                    Value::Dict(changed),
                ],
            );
        }
    }

    /// Installs `handler` for `method`, replacing any earlier handler.
    pub fn on<F>(&self, method: &str, handler: F)
    where
        F: Fn(&[Value]) -> BusResult<Vec<Value>> + Send + Sync + 'static,
    {
        let method = expand(&self.core.destination, method);
        debug!(
            destination = self.core.destination,
            path = %self.core.path,
            method = method,
            "Method handler installed"
        );
        self.core
            .state
            .lock()
            .calls
            .insert(method, Arc::new(handler));
    }

    /// Emits a signal from this object to every matching subscriber.
    pub fn emit(&self, name: &str, body: Vec<Value>) {
        let name = expand(&self.core.destination, name);
        self.service.emit(&name, &self.core.path, body);
    }

    fn connection(&self) -> &ConnectionInner {
        self.conn.as_deref().unwrap_or_else(|| {
            panic!(
                "test bus object {} {} is not bound to a connection",
                self.core.destination, self.core.path
            )
        })
    }

    // Objects taken straight from a service have no connection to check.
    fn check(&self) {
        self.service.check_registered();
        if let Some(conn) = &self.conn {
            conn.check_open();
        }
    }
}

fn match_call_result(method: &str, rule: String, result: BusResult<()>) -> Call {
    Call {
        destination: BUS_NAME.to_string(),
        path: bus_path(),
        method: expand(BUS_NAME, &format!(".{}", method)),
        args: vec![Value::from(rule)],
        result: result.map(|()| Vec::new()),
    }
}

impl BusObject for TestBusObject {
    fn call(&self, method: &str, flags: Flags, args: Vec<Value>) -> Call {
        self.call(method, flags, args)
    }

    fn call_with_context(
        &self,
        ctx: &CallContext,
        method: &str,
        flags: Flags,
        args: Vec<Value>,
    ) -> Call {
        self.call_with_context(ctx, method, flags, args)
    }

    fn go(
        &self,
        method: &str,
        flags: Flags,
        done: UnboundedSender<Call>,
        args: Vec<Value>,
    ) -> Option<Call> {
        self.go(method, flags, done, args)
    }

    fn go_with_context(
        &self,
        ctx: &CallContext,
        method: &str,
        flags: Flags,
        done: UnboundedSender<Call>,
        args: Vec<Value>,
    ) -> Option<Call> {
        self.go_with_context(ctx, method, flags, done, args)
    }

    fn add_match_signal(&self, iface: &str, member: &str, options: &[MatchOption]) -> Call {
        self.add_match_signal(iface, member, options)
    }

    fn remove_match_signal(&self, iface: &str, member: &str, options: &[MatchOption]) -> Call {
        self.remove_match_signal(iface, member, options)
    }

    fn get_property(&self, name: &str) -> BusResult<Variant> {
        self.get_property(name)
    }

    fn destination(&self) -> String {
        self.destination()
    }

    fn path(&self) -> ObjectPath {
        self.path()
    }
}
