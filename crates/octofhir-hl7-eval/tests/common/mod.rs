//! Shared helpers for engine integration tests

#![allow(dead_code)]

use mockall::mock;
use octofhir_hl7_eval::{
    Coding, Hl7DataExtractor, InMemoryTerminology, InputDataExtractor, MappingEngine,
    TemplateRegistry, TerminologyLookup, TerminologyResolver,
};
use octofhir_hl7_types::{ExtractResult, Hl7Type, Segment};
use parking_lot::Mutex;
use std::sync::Arc;

// ============================================================================
// Accessor mock
// ============================================================================

mock! {
    pub Accessor {}

    impl InputDataExtractor for Accessor {
        fn get_structure(&self, segment: &str, rep: usize) -> ExtractResult<Option<Segment>>;
        fn get_all_structures(&self, segment: &str) -> ExtractResult<Vec<Segment>>;
        fn get_types(&self, segment: &Segment, field: usize) -> ExtractResult<Vec<Hl7Type>>;
        fn get_component(&self, value: &Hl7Type, component: usize) -> ExtractResult<Option<Hl7Type>>;
        fn get_sub_component(
            &self,
            value: &Hl7Type,
            component: usize,
            sub_component: usize,
        ) -> ExtractResult<Option<Hl7Type>>;
        fn get_message_type(&self) -> ExtractResult<Option<String>>;
    }
}

/// Accessor that fails the test on any call
pub fn untouchable_accessor() -> MockAccessor {
    let mut accessor = MockAccessor::new();
    accessor.expect_get_structure().never();
    accessor.expect_get_all_structures().never();
    accessor.expect_get_types().never();
    accessor.expect_get_component().never();
    accessor.expect_get_sub_component().never();
    accessor.expect_get_message_type().never();
    accessor
}

// ============================================================================
// Terminology
// ============================================================================

pub fn terminology() -> InMemoryTerminology {
    InMemoryTerminology::from_yaml(
        "test-terminology",
        r#"
tables:
  "0203":
    codes:
      MR: Medical record number
      SS: Social Security number
  "0078":
    codes:
      AA: Critically abnormal
      H: High
systems:
  LN: http://loinc.org
  SCT: http://snomed.info/sct
"#,
    )
    .unwrap()
}

/// Terminology that counts every lookup
#[derive(Default)]
pub struct CountingTerminology {
    inner: InMemoryTerminology,
    calls: Mutex<usize>,
}

impl CountingTerminology {
    pub fn new(inner: InMemoryTerminology) -> Self {
        Self {
            inner,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl TerminologyLookup for CountingTerminology {
    fn resolve(&self, code: &str, table: &str) -> Option<Coding> {
        *self.calls.lock() += 1;
        self.inner.resolve(code, table)
    }

    fn system_url(&self, name: &str) -> Option<String> {
        *self.calls.lock() += 1;
        self.inner.system_url(name)
    }
}

// ============================================================================
// Templates and messages
// ============================================================================

pub const IDENTIFIER_TEMPLATE: &str = r#"
expressions:
  type:
    type: CODEABLE_CONCEPT
    specs: CX.5
    table: "0203"
  system:
    type: SYSTEM_URL
    specs: CX.4
  value:
    type: STRING
    specs: CX.1
    required: true
"#;

pub const HUMAN_NAME_TEMPLATE: &str = r#"
expressions:
  family:
    type: STRING
    specs: XPN.1
  given:
    type: STRING
    specs: XPN.2
    generateList: true
"#;

pub fn registry() -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    registry
        .register_yaml("datatype/Identifier", IDENTIFIER_TEMPLATE)
        .unwrap();
    registry
        .register_yaml("datatype/HumanName", HUMAN_NAME_TEMPLATE)
        .unwrap();
    registry
}

pub fn engine() -> MappingEngine {
    engine_with(registry())
}

pub fn engine_with(registry: TemplateRegistry) -> MappingEngine {
    MappingEngine::new(
        Arc::new(registry),
        TerminologyResolver::new(Arc::new(terminology())),
    )
}

/// Message with the given segments after a standard header
pub fn message(segments: &[&str]) -> Hl7DataExtractor {
    let mut text = String::from("MSH|^~\\&|hl7Integration|hl7Integration|||||ADT^A01|||2.3");
    for segment in segments {
        text.push('\r');
        text.push_str(segment);
    }
    Hl7DataExtractor::new(octofhir_hl7_message::parse(&text).unwrap())
}

pub fn pid(identifiers: &str) -> Segment {
    octofhir_hl7_message::parse(&format!("MSH|^~\\&|A\rPID|1||{}", identifiers))
        .unwrap()
        .segment("PID", 0)
        .cloned()
        .unwrap()
}

pub fn reps(text: &str) -> Vec<Hl7Type> {
    pid(text).repetitions(3).to_vec()
}
