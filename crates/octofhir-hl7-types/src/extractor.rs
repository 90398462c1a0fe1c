//! Message access capability
//!
//! The engine never reads a parsed message directly. Everything goes through
//! [`InputDataExtractor`], which owns the repetition semantics of the source:
//! a field may have zero or more repetitions and the extractor returns them
//! in document order.

use octofhir_hl7_message::{Hl7Type, Segment};
use thiserror::Error;

/// Result type for message access
pub type ExtractResult<T> = Result<T, DataExtractionError>;

/// Failure of the underlying message access
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataExtractionError {
    /// An HL7 index is 1-based; 0 can never address anything
    #[error("Invalid {kind} index {index}")]
    InvalidIndex { kind: String, index: usize },

    /// The message cannot be navigated
    #[error("Message data unavailable: {message}")]
    Unavailable { message: String },
}

impl DataExtractionError {
    pub fn invalid_index(kind: impl Into<String>, index: usize) -> Self {
        Self::InvalidIndex {
            kind: kind.into(),
            index,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Path-addressed read access into a parsed message
pub trait InputDataExtractor {
    /// The `rep`-th (0-based) occurrence of a segment
    fn get_structure(&self, segment: &str, rep: usize) -> ExtractResult<Option<Segment>>;

    /// Every occurrence of a segment in document order
    fn get_all_structures(&self, segment: &str) -> ExtractResult<Vec<Segment>>;

    /// All repetitions of a field (1-based) of a segment
    fn get_types(&self, segment: &Segment, field: usize) -> ExtractResult<Vec<Hl7Type>>;

    /// Component (1-based) of a value
    fn get_component(&self, value: &Hl7Type, component: usize) -> ExtractResult<Option<Hl7Type>>;

    /// Sub-component (1-based) of a component (1-based) of a value
    fn get_sub_component(
        &self,
        value: &Hl7Type,
        component: usize,
        sub_component: usize,
    ) -> ExtractResult<Option<Hl7Type>>;

    /// Message type as `CODE^EVENT`
    fn get_message_type(&self) -> ExtractResult<Option<String>>;
}
