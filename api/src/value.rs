// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

//! Dynamically typed values carried by calls, properties and signals.
//!
//! The bus is loosely typed: handlers take an arbitrary argument list and
//! return an arbitrary result list. `Value` is the tagged union used for all
//! of these; `Variant` is the boundary wrapper that pairs a value with its
//! type signature.

use std::collections::BTreeMap;
use std::fmt;

use crate::validation::validate_object_path;

/// Hierarchical object identifier, e.g. `/org/example/Device0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectPath(pub(crate) String);

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> anyhow::Result<Self> {
        let path = path.into();
        validate_object_path(&path)?;
        Ok(Self(path))
    }

    /// The root path `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `self` equals `namespace` or lies below it.
    pub fn is_in_namespace(&self, namespace: &str) -> bool {
        if namespace == "/" || self.0 == namespace {
            return true;
        }
        self.0
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A dynamically typed bus value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(u8),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Double(f64),
    Str(String),
    ObjectPath(ObjectPath),
    Variant(Box<Variant>),
    Array(Vec<Value>),
    Dict(BTreeMap<String, Value>),
    Struct(Vec<Value>),
}

impl Value {
    /// Type signature of this value in bus notation.
    pub fn signature(&self) -> String {
        match self {
            Value::Bool(_) => "b".to_string(),
            Value::Byte(_) => "y".to_string(),
            Value::Int16(_) => "n".to_string(),
            Value::Uint16(_) => "q".to_string(),
            Value::Int32(_) => "i".to_string(),
            Value::Uint32(_) => "u".to_string(),
            Value::Int64(_) => "x".to_string(),
            Value::Uint64(_) => "t".to_string(),
            Value::Double(_) => "d".to_string(),
            Value::Str(_) => "s".to_string(),
            Value::ObjectPath(_) => "o".to_string(),
            Value::Variant(_) => "v".to_string(),
            Value::Array(items) => format!("a{}", common_signature(items.iter())),
            Value::Dict(entries) => format!("a{{s{}}}", common_signature(entries.values())),
            Value::Struct(fields) => {
                let inner: String = fields.iter().map(Value::signature).collect();
                format!("({})", inner)
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::ObjectPath(p) => Some(p.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Uint32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_variant(&self) -> Option<&Variant> {
        match self {
            Value::Variant(v) => Some(v),
            _ => None,
        }
    }
}

// Element type shared by every item, or `v` when they disagree or there are none.
fn common_signature<'a>(mut items: impl Iterator<Item = &'a Value>) -> String {
    let Some(first) = items.next() else {
        return "v".to_string();
    };
    let signature = first.signature();
    if items.all(|item| item.signature() == signature) {
        signature
    } else {
        "v".to_string()
    }
}

/// A value tagged with its type signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    value: Value,
}

impl Variant {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn signature(&self) -> String {
        self.value.signature()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} {:?}", self.signature(), self.value)
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive!(
    bool => Bool,
    u8 => Byte,
    i16 => Int16,
    u16 => Uint16,
    i32 => Int32,
    u32 => Uint32,
    i64 => Int64,
    u64 => Uint64,
    f64 => Double,
    String => Str,
    ObjectPath => ObjectPath,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<Variant> for Value {
    fn from(v: Variant) -> Self {
        Value::Variant(Box::new(v))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(entries: BTreeMap<String, T>) -> Self {
        Value::Dict(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}
