//! HL7 v2 to FHIR conversion for Rust
//!
//! This crate ties the workspace together:
//! - Built-in mapping templates for ADT^A01 and ORU^R01 and the HL7 code
//!   tables they use
//! - [`Hl7ToFhirConverter`], which turns a raw message into a FHIR `Bundle`
//! - The `hl7conv` command-line tool (feature `cli`)
//!
//! # Example
//!
//! ```
//! use octofhir_hl7::Hl7ToFhirConverter;
//!
//! let converter = Hl7ToFhirConverter::new().unwrap();
//! let bundle = converter
//!     .convert("MSH|^~\\&|SND|FAC|RCV|FAC|20200101||ADT^A01|1|P|2.5\rPID|1||12345^^^^MR||DOE^JANE||19800101|F")
//!     .unwrap();
//!
//! assert_eq!(bundle["entry"][0]["resource"]["resourceType"], "Patient");
//! assert_eq!(bundle["entry"][0]["resource"]["birthDate"], "1980-01-01");
//! ```

// Re-export the workspace crates
pub use octofhir_hl7_eval as eval;
pub use octofhir_hl7_message as message;
pub use octofhir_hl7_types as types;

pub mod builtin;
pub mod converter;
pub mod error;

// Convenience re-exports
pub use converter::{ConverterBuilder, Hl7ToFhirConverter, message_template_name};
pub use error::{ConversionError, ConversionResult};
pub use octofhir_hl7_eval::{EngineConfig, MappingEngine, TemplateRegistry};

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
