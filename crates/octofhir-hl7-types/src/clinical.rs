//! FHIR terminology datatypes produced by the engine

use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// FHIR Coding
///
/// Only `code` is mandatory; an unresolved code keeps `system` and `display` unset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    /// Create a coding with only a code
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            system: None,
            version: None,
            code: code.into(),
            display: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// Convert to an object value in FHIR element order
    pub fn into_value(self) -> Value {
        let mut map = IndexMap::new();
        if let Some(system) = self.system {
            map.insert("system".to_string(), Value::String(system));
        }
        if let Some(version) = self.version {
            map.insert("version".to_string(), Value::String(version));
        }
        map.insert("code".to_string(), Value::String(self.code));
        if let Some(display) = self.display {
            map.insert("display".to_string(), Value::String(display));
        }
        Value::Object(map)
    }
}

/// FHIR CodeableConcept
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn from_coding(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn into_value(self) -> Value {
        let mut map = IndexMap::new();
        if !self.coding.is_empty() {
            map.insert(
                "coding".to_string(),
                Value::List(self.coding.into_iter().map(Coding::into_value).collect()),
            );
        }
        if let Some(text) = self.text {
            map.insert("text".to_string(), Value::String(text));
        }
        Value::Object(map)
    }
}
