// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

//! Failures a simulated bus object reports through the normal call result.

use thiserror::Error;

/// Error type for simulated remote operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("No such method: {0}")]
    NoSuchMethod(String),
    #[error("No such property: {0}")]
    NoSuchProperty(String),
    #[error("Unsupported match type: {0}")]
    UnsupportedMatchType(String),
    #[error("Match not found")]
    MatchNotFound,
    #[error("Service unknown: {0}")]
    ServiceUnknown(String),
    /// Failure reported by a test-installed method handler.
    #[error("{0}")]
    Failed(String),
    /// Failure reported by a method handler under a specific bus error name.
    #[error("{name}: {message}")]
    Remote { name: String, message: String },
}

impl BusError {
    /// Shorthand for handlers that fail with a plain message.
    pub fn failed(message: impl Into<String>) -> Self {
        BusError::Failed(message.into())
    }

    /// Shorthand for handlers that fail with a named bus error.
    pub fn remote(name: impl Into<String>, message: impl Into<String>) -> Self {
        BusError::Remote {
            name: name.into(),
            message: message.into(),
        }
    }

    /// The bus error name a real daemon would attach to this failure.
    pub fn name(&self) -> &str {
        match self {
            BusError::NoSuchMethod(_) => "org.freedesktop.DBus.Error.UnknownMethod",
            BusError::NoSuchProperty(_) => "org.freedesktop.DBus.Error.UnknownProperty",
            BusError::UnsupportedMatchType(_) => "org.freedesktop.DBus.Error.MatchRuleInvalid",
            BusError::MatchNotFound => "org.freedesktop.DBus.Error.MatchRuleNotFound",
            BusError::ServiceUnknown(_) => "org.freedesktop.DBus.Error.ServiceUnknown",
            BusError::Failed(_) => "org.freedesktop.DBus.Error.Failed",
            BusError::Remote { name, .. } => name.as_str(),
        }
    }
}

/// Result type alias for simulated remote operations
pub type BusResult<T> = std::result::Result<T, BusError>;
