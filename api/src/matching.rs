// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

//! Signal match options and filter evaluation

use std::collections::BTreeMap;

use crate::value::ObjectPath;
use crate::value::Value;

/// A single `key=value` filter of a signal match rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOption {
    key: String,
    value: String,
}

impl MatchOption {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Filter on an arbitrary key.
pub fn with_match_option(key: impl Into<String>, value: impl Into<String>) -> MatchOption {
    MatchOption {
        key: key.into(),
        value: value.into(),
    }
}

/// Filter on the exact emitting object path.
pub fn with_match_object_path(path: &ObjectPath) -> MatchOption {
    with_match_option("path", path.as_str())
}

/// Filter on the emitting object path or anything below it.
pub fn with_match_path_namespace(namespace: &ObjectPath) -> MatchOption {
    with_match_option("path_namespace", namespace.as_str())
}

/// Filter on the sender, by unique id or well-known name.
pub fn with_match_sender(sender: impl Into<String>) -> MatchOption {
    with_match_option("sender", sender)
}

/// Filter on the string value of body argument `index`.
pub fn with_match_arg(index: usize, value: impl Into<String>) -> MatchOption {
    with_match_option(format!("arg{}", index), value)
}

/// Filter on body argument `index` with path-prefix semantics.
pub fn with_match_arg_path(index: usize, value: impl Into<String>) -> MatchOption {
    with_match_option(format!("arg{}path", index), value)
}

pub fn with_match_interface(interface: impl Into<String>) -> MatchOption {
    with_match_option("interface", interface)
}

pub fn with_match_member(member: impl Into<String>) -> MatchOption {
    with_match_option("member", member)
}

/// Returns true if `key` is a filter the test bus knows how to evaluate.
pub fn is_supported_match_key(key: &str) -> bool {
    matches!(key, "path" | "path_namespace" | "sender") || key.starts_with("arg")
}

/// Normalized, comparable set of match options.
///
/// Two option lists that set the same keys to the same values compare equal
/// regardless of order. When a key repeats, the last value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MatchOptions(BTreeMap<String, String>);

impl MatchOptions {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the filter as a bus match rule string.
    pub fn rule(&self, interface: &str, member: &str) -> String {
        let mut rule = format!(
            "type='signal',interface='{}',member='{}'",
            interface, member
        );
        for (key, value) in self.iter() {
            rule.push_str(&format!(",{}='{}'", key, value));
        }
        rule
    }

    /// First key the test bus cannot evaluate, if any.
    pub fn first_unsupported_key(&self) -> Option<&str> {
        self.keys().find(|key| !is_supported_match_key(key))
    }

    /// Evaluates the filter against an emitted signal.
    ///
    /// `sender_names` are the well-known names owned by the sender; a `sender`
    /// filter matches either the unique id or one of those names.
    pub fn matches(
        &self,
        sender: &str,
        sender_names: &[String],
        path: &ObjectPath,
        body: &[Value],
    ) -> bool {
        self.iter()
            .all(|(key, expected)| match_one(key, expected, sender, sender_names, path, body))
    }
}

impl FromIterator<MatchOption> for MatchOptions {
    fn from_iter<I: IntoIterator<Item = MatchOption>>(iter: I) -> Self {
        Self(iter.into_iter().map(|o| (o.key, o.value)).collect())
    }
}

/// Normalizes a list of options into a comparable map.
pub fn match_option_map(options: &[MatchOption]) -> MatchOptions {
    options.iter().cloned().collect()
}

fn match_one(
    key: &str,
    expected: &str,
    sender: &str,
    sender_names: &[String],
    path: &ObjectPath,
    body: &[Value],
) -> bool {
    match key {
        "path" => path.as_str() == expected,
        "path_namespace" => path.is_in_namespace(expected),
        "sender" => sender == expected || sender_names.iter().any(|n| n == expected),
        _ => match parse_arg_key(key) {
            Some((index, false)) => body
                .get(index)
                .and_then(Value::as_str)
                .is_some_and(|actual| actual == expected),
            Some((index, true)) => body
                .get(index)
                .and_then(Value::as_str)
                .is_some_and(|actual| arg_path_matches(actual, expected)),
            None => false,
        },
    }
}

// `argN` -> (N, false), `argNpath` -> (N, true).
fn parse_arg_key(key: &str) -> Option<(usize, bool)> {
    let rest = key.strip_prefix("arg")?;
    let (digits, is_path) = match rest.strip_suffix("path") {
        Some(digits) => (digits, true),
        None => (rest, false),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|index| (index, is_path))
}

fn arg_path_matches(actual: &str, expected: &str) -> bool {
    actual == expected
        || (expected.ends_with('/') && actual.starts_with(expected))
        || (actual.ends_with('/') && expected.starts_with(actual))
}
