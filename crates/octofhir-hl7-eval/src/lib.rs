//! HL7 v2 to FHIR mapping evaluation engine
//!
//! This crate evaluates YAML mapping templates against parsed HL7 v2 messages
//! and produces FHIR-shaped values. The template language has three small
//! mini-languages, each compiled once when a template loads:
//!
//! - **Specifications**: message paths such as `PID.3.1`, `CX.4:SYSTEM_URL` or
//!   `OBX.5*`, optionally chained as fallbacks (`PID.3|$patientId`)
//! - **Variables**: named fallback lists resolved into the evaluation context
//! - **Conditions**: guards such as `$status EQUALS F AND $value NOT_NULL`
//!
//! # Example
//!
//! ```
//! use octofhir_hl7_eval::{Hl7DataExtractor, MappingEngine, TemplateRegistry, TerminologyResolver};
//! use std::sync::Arc;
//!
//! let mut registry = TemplateRegistry::new();
//! registry
//!     .register_yaml(
//!         "resource/Patient",
//!         "resourceType: Patient\nexpressions:\n  gender:\n    type: STRING\n    specs: PID.8\n",
//!     )
//!     .unwrap();
//!
//! let engine = MappingEngine::new(Arc::new(registry), TerminologyResolver::default());
//! let message = octofhir_hl7_message::parse("MSH|^~\\&|A|B\rPID|1||123||DOE^JANE||19800101|F").unwrap();
//! let accessor = Hl7DataExtractor::new(message);
//!
//! let mut ctx = engine.new_context();
//! let patient = engine
//!     .evaluate_template("resource/Patient", &mut ctx, &accessor, None)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(patient.to_json()["gender"], "F");
//! ```
//!
//! # Architecture
//!
//! - `MappingEngine`: walks compiled templates and dispatches on expression kind
//! - `EvaluationContext`: named results for one conversion, plus the nesting guard
//! - `Specification` / `Variable` / `Condition`: the compiled mini-languages
//! - `DataTypeConverter` and `TerminologyResolver`: value conversion and code lookup
//! - `Hl7DataExtractor`: message access over a parsed message

pub mod condition;
pub mod context;
pub mod datatype;
pub mod engine;
pub mod error;
pub mod expression;
pub mod extractor;
mod parser;
pub mod specification;
pub mod template;
pub mod terminology;
pub mod variable;

pub use condition::Condition;
pub use context::EvaluationContext;
pub use datatype::DataTypeConverter;
pub use engine::{EngineConfig, MappingEngine};
pub use error::{EvalError, EvalResult};
pub use expression::{Expression, ExpressionKind};
pub use extractor::Hl7DataExtractor;
pub use specification::{SpecSource, Specification};
pub use template::{
    ExpressionDef, MessageResource, MessageTemplate, ResourceTemplate, ResourceTemplateDef,
    TemplateRegistry,
};
pub use terminology::{InMemoryTerminology, TerminologyLookup, TerminologyResolver};
pub use variable::Variable;

pub use octofhir_hl7_types::{
    CodeableConcept, Coding, DataType, EvaluationResult, InputDataExtractor, Value,
};
