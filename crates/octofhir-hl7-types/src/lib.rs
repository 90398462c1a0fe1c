//! Runtime values for HL7 v2 to FHIR mapping evaluation
//!
//! This crate defines what flows through the evaluation engine:
//!
//! - [`Value`]: strings, numbers, booleans, ordered objects, lists, and raw HL7
//!   segments/types used as base values
//! - [`EvaluationResult`]: the empty/scalar/list result of any evaluation step
//! - [`Coding`] and [`CodeableConcept`]: the FHIR terminology datatypes the
//!   engine builds
//! - [`DataType`]: the conversion targets of value expressions
//! - [`InputDataExtractor`]: the message access capability consumed by the engine

pub mod clinical;
pub mod data_type;
pub mod extractor;
pub mod value;

pub use clinical::{CodeableConcept, Coding};
pub use data_type::{DataType, UnknownDataTypeError};
pub use extractor::{DataExtractionError, ExtractResult, InputDataExtractor};
pub use value::{EvaluationResult, Value};

pub use octofhir_hl7_message::{Hl7Type, Segment};
