//! Message access over a parsed HL7 message
//!
//! This module provides the [`InputDataExtractor`] implementation the engine
//! uses for real messages.

use octofhir_hl7_message::{Hl7Type, Message, Segment};
use octofhir_hl7_types::{DataExtractionError, ExtractResult, InputDataExtractor};

/// Adapter that exposes a parsed [`Message`] through [`InputDataExtractor`]
#[derive(Debug, Clone)]
pub struct Hl7DataExtractor {
    message: Message,
}

impl Hl7DataExtractor {
    /// Create a new adapter for a message
    pub fn new(message: Message) -> Self {
        Self { message }
    }

    /// Get the underlying message
    pub fn message(&self) -> &Message {
        &self.message
    }
}

fn check_index(kind: &str, index: usize) -> ExtractResult<()> {
    if index == 0 {
        return Err(DataExtractionError::invalid_index(kind, index));
    }
    Ok(())
}

impl InputDataExtractor for Hl7DataExtractor {
    fn get_structure(&self, segment: &str, rep: usize) -> ExtractResult<Option<Segment>> {
        Ok(self.message.segment(segment, rep).cloned())
    }

    fn get_all_structures(&self, segment: &str) -> ExtractResult<Vec<Segment>> {
        Ok(self.message.segments_named(segment).cloned().collect())
    }

    fn get_types(&self, segment: &Segment, field: usize) -> ExtractResult<Vec<Hl7Type>> {
        check_index("field", field)?;
        Ok(segment.repetitions(field).to_vec())
    }

    fn get_component(&self, value: &Hl7Type, component: usize) -> ExtractResult<Option<Hl7Type>> {
        check_index("component", component)?;
        Ok(value.component(component).cloned())
    }

    fn get_sub_component(
        &self,
        value: &Hl7Type,
        component: usize,
        sub_component: usize,
    ) -> ExtractResult<Option<Hl7Type>> {
        check_index("component", component)?;
        check_index("sub-component", sub_component)?;
        Ok(value
            .component(component)
            .and_then(|c| c.component(sub_component))
            .cloned())
    }

    fn get_message_type(&self) -> ExtractResult<Option<String>> {
        Ok(self.message.message_type())
    }
}
