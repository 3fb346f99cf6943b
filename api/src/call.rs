// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

//! Call records, call flags and signals

use std::ops::BitOr;
use std::time::Instant;

use crate::error::BusError;
use crate::error::BusResult;
use crate::value::ObjectPath;
use crate::value::Value;

/// Flags attached to a method call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags(u8);

impl Flags {
    pub const NONE: Flags = Flags(0);
    pub const NO_REPLY_EXPECTED: Flags = Flags(0x1);
    pub const NO_AUTO_START: Flags = Flags(0x2);
    pub const ALLOW_INTERACTIVE_AUTHORIZATION: Flags = Flags(0x4);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// Caller context for the `*_with_context` call variants.
///
/// The test bus accepts a context for signature parity with a real proxy but
/// never cancels a call because of it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context with no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// A completed method call: where it went, what was sent, what came back.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub destination: String,
    pub path: ObjectPath,
    pub method: String,
    pub args: Vec<Value>,
    pub result: BusResult<Vec<Value>>,
}

impl Call {
    /// Return values of a successful call; empty if the call failed.
    pub fn body(&self) -> &[Value] {
        match &self.result {
            Ok(body) => body,
            Err(_) => &[],
        }
    }

    pub fn err(&self) -> Option<&BusError> {
        self.result.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> BusResult<Vec<Value>> {
        self.result
    }
}

/// A signal as delivered to a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Unique id of the emitting service.
    pub sender: String,
    pub path: ObjectPath,
    /// Fully-qualified `interface.member` name.
    pub name: String,
    pub body: Vec<Value>,
}
