// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

//! Well-known names and name expansion helpers

use crate::value::ObjectPath;

/// Name of the bus daemon itself.
pub const BUS_NAME: &str = "org.freedesktop.DBus";

/// Object path of the bus daemon.
pub const BUS_PATH: &str = "/org/freedesktop/DBus";

/// `BUS_PATH` as an object path.
pub fn bus_path() -> ObjectPath {
    ObjectPath(BUS_PATH.to_string())
}

/// Signal emitted when properties of an object change.
pub const PROPERTIES_CHANGED: &str = "org.freedesktop.DBus.Properties.PropertiesChanged";

/// Expands a destination-relative name into its fully-qualified form.
///
/// A name starting with `.` is relative to `destination`, so `.Start` on
/// `org.example.Service` becomes `org.example.Service.Start`. Any other name
/// is already fully qualified and is returned unchanged.
pub fn expand(destination: &str, name: &str) -> String {
    if name.starts_with('.') {
        format!("{}{}", destination, name)
    } else {
        name.to_string()
    }
}

/// Splits `interface.member` at the last `.`.
/// Returns an empty interface if the name has no `.`.
pub fn split_member(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((interface, member)) => (interface, member),
        None => ("", name),
    }
}
