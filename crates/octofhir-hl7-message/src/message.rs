//! Parsed message

use crate::model::{Delimiters, Hl7Type, Segment};

/// A parsed HL7 v2 message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    delimiters: Delimiters,
    segments: Vec<Segment>,
}

impl Message {
    pub fn new(delimiters: Delimiters, segments: Vec<Segment>) -> Self {
        Self {
            delimiters,
            segments,
        }
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The `rep`-th (0-based) occurrence of a segment
    pub fn segment(&self, name: &str, rep: usize) -> Option<&Segment> {
        self.segments.iter().filter(|s| s.name == name).nth(rep)
    }

    /// All occurrences of a segment in document order
    pub fn segments_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Segment> + use<'a, 'n> {
        self.segments.iter().filter(move |s| s.name == name)
    }

    pub fn header(&self) -> Option<&Segment> {
        self.segment("MSH", 0)
    }

    /// Message type from MSH-9 as `CODE^EVENT` (e.g. `ADT^A01`)
    pub fn message_type(&self) -> Option<String> {
        let msh9 = self.header()?.repetitions(9).first()?;
        let code = msh9.component(1).and_then(Hl7Type::text)?;
        match msh9.component(2).and_then(Hl7Type::text) {
            Some(event) => Some(format!("{}^{}", code, event)),
            None => Some(code.to_string()),
        }
    }

    /// Message control id (MSH-10)
    pub fn control_id(&self) -> Option<&str> {
        self.header()?.repetitions(10).first()?.text()
    }

    /// Version id (MSH-12)
    pub fn version(&self) -> Option<&str> {
        self.header()?.repetitions(12).first()?.text()
    }
}
