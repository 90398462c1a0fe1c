//! HL7 v2 message model and parser
//!
//! This crate turns the pipe-delimited HL7 v2 wire format into a navigable
//! structure:
//!
//! - [`Message`]: ordered segments plus the delimiters declared in MSH
//! - [`Segment`]: a named segment with 1-based fields
//! - [`Field`]: the repetitions of one field (`~` separated)
//! - [`Hl7Type`]: a primitive or composite value (components `^`, sub-components `&`)
//!
//! # Example
//!
//! ```
//! use octofhir_hl7_message::parse;
//!
//! let message = parse("MSH|^~\\&|APP|FAC|||||ADT^A01|1|P|2.3\rPID|1||000010016^^^MR").unwrap();
//! let pid = message.segment("PID", 0).unwrap();
//! assert_eq!(pid.repetitions(3)[0].text(), Some("000010016"));
//! ```
//!
//! The parser does not validate a message against HL7 structure definitions;
//! it only enforces the encoding rules needed to split it.

mod error;
mod message;
mod model;
mod parser;

pub use error::{ParseError, ParseResult};
pub use message::Message;
pub use model::{Delimiters, Field, Hl7Type, Segment};
pub use parser::{escape, parse, unescape};
