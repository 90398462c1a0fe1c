//! Value types - runtime representation of mapped data
//!
//! [`Value`] covers both sides of the conversion: the raw HL7 structures read
//! from a message and the FHIR-shaped data built from them.
//! [`EvaluationResult`] is what every evaluation step produces.

use indexmap::IndexMap;
use octofhir_hl7_message::{Hl7Type, Segment};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text
    String(String),
    /// Arbitrary precision number
    Number(Decimal),
    /// Boolean
    Boolean(bool),
    /// Ordered mapping of field name to value (FHIR complex types, resources)
    Object(IndexMap<String, Value>),
    /// Ordered list of values
    List(Vec<Value>),
    /// Raw segment from the source message
    Segment(Segment),
    /// Raw field repetition, component or sub-component
    Type(Hl7Type),
}

impl Value {
    /// Create a string value
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Create an object value from ordered entries
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// True for blank strings, empty collections and blank raw values
    pub fn is_empty(&self) -> bool {
        match self {
            Self::String(s) => s.trim().is_empty(),
            Self::Number(_) | Self::Boolean(_) => false,
            Self::Object(map) => map.values().all(Value::is_empty),
            Self::List(items) => items.iter().all(Value::is_empty),
            Self::Segment(segment) => segment.fields.iter().all(|f| f.is_empty()),
            Self::Type(t) => t.is_empty(),
        }
    }

    /// Stringified scalar form, used for condition comparisons and string conversion
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => Some(n.normalize().to_string()),
            Self::Boolean(b) => Some(b.to_string()),
            Self::Type(t) => t.text().map(str::to_string),
            Self::List(items) => items.first().and_then(Value::to_text),
            Self::Object(_) | Self::Segment(_) => None,
        }
    }

    /// Try to get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as object
    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Try to get as list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as raw HL7 type
    pub fn as_hl7_type(&self) -> Option<&Hl7Type> {
        match self {
            Self::Type(t) => Some(t),
            _ => None,
        }
    }

    /// Field of an object value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Name of the value kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::Number(_) => "Number",
            Self::Boolean(_) => "Boolean",
            Self::Object(_) => "Object",
            Self::List(_) => "List",
            Self::Segment(_) => "Segment",
            Self::Type(_) => "Type",
        }
    }

    /// Convert to JSON
    ///
    /// Raw primitives are written as their text; raw composites and segments
    /// in their canonical encoded form (see `Hl7Type`'s `Display`).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Number(n) => number_to_json(n),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Self::Segment(segment) => serde_json::Value::String(segment.to_string()),
            Self::Type(Hl7Type::Primitive(s)) => serde_json::Value::String(s.clone()),
            Self::Type(t) => serde_json::Value::String(t.to_string()),
        }
    }

    /// Build a value from JSON; `null` has no value representation
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Self::Boolean(*b)),
            serde_json::Value::Number(n) => Some(
                Decimal::from_str(&n.to_string())
                    .or_else(|_| Decimal::from_scientific(&n.to_string()))
                    .map(Self::Number)
                    .unwrap_or_else(|_| Self::String(n.to_string())),
            ),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Array(items) => {
                Some(Self::List(items.iter().filter_map(Value::from_json).collect()))
            }
            serde_json::Value::Object(map) => Some(Self::Object(
                map.iter()
                    .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }
}

fn number_to_json(n: &Decimal) -> serde_json::Value {
    if n.fract().is_zero() {
        if let Some(i) = n.to_i64() {
            return serde_json::Value::from(i);
        }
    }
    n.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(n.to_string()))
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Number(n) => write!(f, "{}", n.normalize()),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Segment(segment) => write!(f, "{}", segment),
            Self::Type(t) => write!(f, "{}", t),
            Self::Object(_) | Self::List(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<Hl7Type> for Value {
    fn from(value: Hl7Type) -> Self {
        Self::Type(value)
    }
}

impl From<Segment> for Value {
    fn from(value: Segment) -> Self {
        Self::Segment(value)
    }
}

/// Result of one evaluation step
///
/// Absence ("this expression produced nothing") is modelled outside this type
/// as `Option<EvaluationResult>`; `Empty` is a present but blank result.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EvaluationResult {
    #[default]
    Empty,
    Scalar(Value),
    List(Vec<Value>),
}

impl EvaluationResult {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Scalar(value.into())
    }

    /// Build a result from converted candidates
    ///
    /// With `multiple` every value is kept in order, otherwise only the first.
    /// No values gives `Empty` in both cases.
    pub fn from_values(values: Vec<Value>, multiple: bool) -> Self {
        if values.is_empty() {
            return Self::Empty;
        }
        if multiple {
            Self::List(values)
        } else {
            values.into_iter().next().map_or(Self::Empty, Self::Scalar)
        }
    }

    /// True for `Empty`, a list with no populated entries, or a blank scalar
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Scalar(value) => value.is_empty(),
            Self::List(values) => values.iter().all(Value::is_empty),
        }
    }

    /// The values held by this result, in order
    pub fn values(&self) -> &[Value] {
        match self {
            Self::Empty => &[],
            Self::Scalar(value) => std::slice::from_ref(value),
            Self::List(values) => values,
        }
    }

    pub fn first(&self) -> Option<&Value> {
        self.values().first()
    }

    /// Collapse into a single value; lists become `Value::List`
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Empty => None,
            Self::Scalar(value) => Some(value),
            Self::List(values) => Some(Value::List(values)),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Empty => serde_json::Value::Null,
            Self::Scalar(value) => value.to_json(),
            Self::List(values) => serde_json::Value::Array(values.iter().map(Value::to_json).collect()),
        }
    }
}

impl From<Value> for EvaluationResult {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}
