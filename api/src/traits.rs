// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

use futures::channel::mpsc::UnboundedSender;

use crate::call::Call;
use crate::call::CallContext;
use crate::call::Flags;
use crate::error::BusResult;
use crate::matching::MatchOption;
use crate::value::ObjectPath;
use crate::value::Value;
use crate::value::Variant;

/// Call surface of a remote object proxy.
/// Production code is written against this trait so tests can substitute an
/// in-process object for a real connection.
pub trait BusObject {
    /// Call a method and wait for its reply
    fn call(&self, method: &str, flags: Flags, args: Vec<Value>) -> Call;

    /// Like `call`, with a caller context
    fn call_with_context(
        &self,
        ctx: &CallContext,
        method: &str,
        flags: Flags,
        args: Vec<Value>,
    ) -> Call;

    /// Call a method without waiting; the completed call is sent on `done`.
    /// Returns the pending call if the implementation tracks one.
    fn go(
        &self,
        method: &str,
        flags: Flags,
        done: UnboundedSender<Call>,
        args: Vec<Value>,
    ) -> Option<Call>;

    /// Like `go`, with a caller context
    fn go_with_context(
        &self,
        ctx: &CallContext,
        method: &str,
        flags: Flags,
        done: UnboundedSender<Call>,
        args: Vec<Value>,
    ) -> Option<Call>;

    /// Subscribe the owning connection to `iface.member` signals
    fn add_match_signal(&self, iface: &str, member: &str, options: &[MatchOption]) -> Call;

    /// Drop a subscription previously added with the same options
    fn remove_match_signal(&self, iface: &str, member: &str, options: &[MatchOption]) -> Call;

    /// Read a property
    fn get_property(&self, name: &str) -> BusResult<Variant>;

    /// Destination that calls are sent to
    fn destination(&self) -> String;

    /// Object path that calls are sent to
    fn path(&self) -> ObjectPath;
}
