// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

//! Simple in-process implementation of a message bus.
//!
//! This is meant for testing purposes.
//! Services expose simulated objects whose methods and properties are
//! scripted by the test, and code under test reaches them through the same
//! `BusObject` surface it would use against a real bus.
//! It is not meant for use outside of tests.

mod bus;
mod config;
mod connection;
mod object;
mod service;

pub use bus::TestBus;
pub use config::CALL_DELAY_ENV;
pub use config::GO_CALL_DELAY;
pub use config::TestBusConfig;
pub use connection::TestBusConnection;
pub use object::MethodHandler;
pub use object::TestBusObject;
pub use service::TestBusService;
