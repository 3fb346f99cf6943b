// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

//! TestBus API - Core types and interfaces
//!
//! This crate defines the vocabulary shared by bus clients and the in-process
//! test bus:
//! - `BusObject` trait: the call, property and signal surface of a remote object
//! - `Value`/`Variant`: dynamically typed call arguments and results
//! - `MatchOptions`: normalized signal filters
//! - `BusError`: failures reported through call results

pub mod call;
pub mod error;
pub mod matching;
pub mod names;
pub mod traits;
pub mod validation;
pub mod value;

// Re-export commonly used items
pub use call::Call;
pub use call::CallContext;
pub use call::Flags;
pub use call::Signal;
pub use error::BusError;
pub use error::BusResult;
pub use matching::MatchOption;
pub use matching::MatchOptions;
pub use matching::match_option_map;
pub use names::expand;
pub use traits::BusObject;
pub use validation::validate_bus_name;
pub use validation::validate_object_path;
pub use value::ObjectPath;
pub use value::Value;
pub use value::Variant;
