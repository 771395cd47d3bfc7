use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::value::{ArrayValue, BytesValue, MapValue};

/// A single field value as stored by the document store.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    kind: ValueKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    String(String),
    Bytes(BytesValue),
    /// A pointer at another document, stored as a slash-separated path.
    Reference(String),
    Array(ArrayValue),
    Map(MapValue),
}

impl Value {
    pub fn null() -> Self {
        Self {
            kind: ValueKind::Null,
        }
    }

    pub fn from_bool(value: bool) -> Self {
        Self {
            kind: ValueKind::Boolean(value),
        }
    }

    pub fn from_integer(value: i64) -> Self {
        Self {
            kind: ValueKind::Integer(value),
        }
    }

    pub fn from_double(value: f64) -> Self {
        Self {
            kind: ValueKind::Double(value),
        }
    }

    pub fn from_timestamp(value: DateTime<Utc>) -> Self {
        Self {
            kind: ValueKind::Timestamp(value),
        }
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::String(value.into()),
        }
    }

    pub fn from_bytes(value: BytesValue) -> Self {
        Self {
            kind: ValueKind::Bytes(value),
        }
    }

    pub fn from_reference(path: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::Reference(path.into()),
        }
    }

    pub fn from_array(values: Vec<Value>) -> Self {
        Self {
            kind: ValueKind::Array(ArrayValue::new(values)),
        }
    }

    pub fn from_map(map: BTreeMap<String, Value>) -> Self {
        Self {
            kind: ValueKind::Map(MapValue::new(map)),
        }
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match &self.kind {
            ValueKind::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match &self.kind {
            ValueKind::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Numeric view that unifies integers and doubles.
    pub fn as_number(&self) -> Option<f64> {
        match &self.kind {
            ValueKind::Integer(i) => Some(*i as f64),
            ValueKind::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.kind {
            ValueKind::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Reference(path) => Some(path.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::from_bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::from_integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::from_integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::from_double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::from_string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::from_string(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::from_timestamp(value)
    }
}
