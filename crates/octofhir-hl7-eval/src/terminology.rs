//! Terminology integration
//!
//! Codes read from a message are mapped to FHIR codings through a
//! [`TerminologyLookup`]. [`TerminologyResolver`] wraps a lookup and never
//! fails: an unknown code still produces a coding carrying just the code.

use crate::error::{EvalError, EvalResult};
use indexmap::IndexMap;
use octofhir_hl7_types::Coding;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Base URL of HL7 v2 table code systems
pub const V2_TABLE_SYSTEM_PREFIX: &str = "http://terminology.hl7.org/CodeSystem/v2-";

/// Source of code system metadata
pub trait TerminologyLookup: Send + Sync {
    /// Resolve a code within an HL7 table (e.g. `0203`)
    fn resolve(&self, code: &str, table: &str) -> Option<Coding>;

    /// URL of a coding system identified by name (e.g. `LN`)
    fn system_url(&self, name: &str) -> Option<String>;
}

/// Resolver used by the engine; degrades gracefully on unknown codes
#[derive(Clone)]
pub struct TerminologyResolver {
    lookup: Arc<dyn TerminologyLookup>,
}

impl Default for TerminologyResolver {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryTerminology::default()))
    }
}

impl std::fmt::Debug for TerminologyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminologyResolver").finish_non_exhaustive()
    }
}

impl TerminologyResolver {
    /// Create a resolver over a lookup
    pub fn new(lookup: Arc<dyn TerminologyLookup>) -> Self {
        Self { lookup }
    }

    /// Get the underlying lookup
    pub fn inner(&self) -> &Arc<dyn TerminologyLookup> {
        &self.lookup
    }

    /// Coding for a code; without a table or on a miss only `code` is set
    pub fn coding(&self, code: &str, table: Option<&str>) -> Coding {
        let Some(table) = table else {
            return Coding::new(code);
        };
        match self.lookup.resolve(code, table) {
            Some(coding) => coding,
            None => {
                log::warn!("Code '{}' not found in table {}", code, table);
                Coding::new(code)
            }
        }
    }

    /// URL for a coding system name
    pub fn system_url(&self, name: &str) -> Option<String> {
        let url = self.lookup.system_url(name);
        if url.is_none() {
            log::debug!("No system URL for '{}'", name);
        }
        url
    }
}

/// One code table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTable {
    /// Explicit code system URL; HL7 tables default to the v2 table system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Code to display text
    #[serde(default)]
    pub codes: IndexMap<String, String>,
}

/// Table-backed terminology, loadable from YAML
///
/// ```yaml
/// tables:
///   "0203":
///     codes:
///       MR: Medical record number
/// systems:
///   LN: http://loinc.org
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryTerminology {
    #[serde(default)]
    pub tables: IndexMap<String, CodeTable>,
    #[serde(default)]
    pub systems: IndexMap<String, String>,
}

impl InMemoryTerminology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse tables from YAML text
    pub fn from_yaml(source_name: &str, yaml: &str) -> EvalResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| EvalError::template_load(source_name, e))
    }

    /// Load tables from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> EvalResult<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let yaml = std::fs::read_to_string(path).map_err(|e| EvalError::template_load(&name, e))?;
        Self::from_yaml(&name, &yaml)
    }

    /// Add a code to a table
    pub fn add_code(&mut self, table: &str, code: impl Into<String>, display: impl Into<String>) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .codes
            .insert(code.into(), display.into());
    }

    /// Register a coding system URL under a name
    pub fn add_system(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.systems.insert(name.into(), url.into());
    }

    /// Merge another set of tables; entries in `other` win
    pub fn merge(&mut self, other: InMemoryTerminology) {
        for (id, table) in other.tables {
            let target = self.tables.entry(id).or_default();
            if table.system.is_some() {
                target.system = table.system;
            }
            target.codes.extend(table.codes);
        }
        self.systems.extend(other.systems);
    }

    fn table_system(id: &str, table: &CodeTable) -> String {
        table
            .system
            .clone()
            .unwrap_or_else(|| format!("{}{}", V2_TABLE_SYSTEM_PREFIX, id))
    }
}

impl TerminologyLookup for InMemoryTerminology {
    fn resolve(&self, code: &str, table: &str) -> Option<Coding> {
        let entry = self.tables.get(table)?;
        let display = entry.codes.get(code)?;
        Some(
            Coding::new(code)
                .with_system(Self::table_system(table, entry))
                .with_display(display.clone()),
        )
    }

    fn system_url(&self, name: &str) -> Option<String> {
        if let Some(url) = self.systems.get(name) {
            return Some(url.clone());
        }
        // A URL already names its system
        if name.starts_with("http://") || name.starts_with("https://") || name.starts_with("urn:") {
            return Some(name.to_string());
        }
        self.systems
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, url)| url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminology() -> InMemoryTerminology {
        InMemoryTerminology::from_yaml(
            "test",
            r#"
tables:
  "0203":
    codes:
      MR: Medical record number
  LOCAL:
    system: http://example.org/codes
    codes:
      A: Alpha
systems:
  LN: http://loinc.org
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_table_default_system() {
        let coding = terminology().resolve("MR", "0203").unwrap();
        assert_eq!(
            coding.system.as_deref(),
            Some("http://terminology.hl7.org/CodeSystem/v2-0203")
        );
        assert_eq!(coding.display.as_deref(), Some("Medical record number"));
    }

    #[test]
    fn test_explicit_table_system() {
        let coding = terminology().resolve("A", "LOCAL").unwrap();
        assert_eq!(coding.system.as_deref(), Some("http://example.org/codes"));
    }

    #[test]
    fn test_resolver_degrades_to_code() {
        let resolver = TerminologyResolver::new(Arc::new(terminology()));
        assert_eq!(resolver.coding("ZZ", Some("0203")), Coding::new("ZZ"));
        assert_eq!(resolver.coding("MR", None), Coding::new("MR"));
    }

    #[test]
    fn test_system_urls() {
        let terminology = terminology();
        assert_eq!(terminology.system_url("LN").as_deref(), Some("http://loinc.org"));
        assert_eq!(terminology.system_url("ln").as_deref(), Some("http://loinc.org"));
        assert_eq!(terminology.system_url("SY1"), None);
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = terminology();
        let mut extra = InMemoryTerminology::new();
        extra.add_code("0203", "MR", "Medical record");
        extra.add_system("SCT", "http://snomed.info/sct");
        base.merge(extra);
        assert_eq!(
            base.resolve("MR", "0203").unwrap().display.as_deref(),
            Some("Medical record")
        );
        assert!(base.system_url("SCT").is_some());
    }
}
