//! Segment, field and type structures

use crate::parser::escape;
use std::fmt;

/// Delimiters declared in MSH-1 and MSH-2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: Option<char>,
    pub sub_component: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: Some('\\'),
            sub_component: '&',
        }
    }
}

impl Delimiters {
    /// The MSH-2 encoding characters in declaration order
    pub fn encoding_characters(&self) -> String {
        let mut chars = String::with_capacity(4);
        chars.push(self.component);
        chars.push(self.repetition);
        if let Some(escape) = self.escape {
            chars.push(escape);
        }
        chars.push(self.sub_component);
        chars
    }
}

/// A value held by one field repetition, component or sub-component
///
/// HL7 v2 does not carry type information on the wire, so values are kept
/// structural: a primitive is a single (unescaped) string, a composite holds
/// its components in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hl7Type {
    Primitive(String),
    Composite(Vec<Hl7Type>),
}

impl Hl7Type {
    /// Create a primitive value
    pub fn primitive(value: impl Into<String>) -> Self {
        Self::Primitive(value.into())
    }

    /// True when every leaf of the value is blank
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Primitive(s) => s.trim().is_empty(),
            Self::Composite(parts) => parts.iter().all(Hl7Type::is_empty),
        }
    }

    /// Text of the value: the primitive itself or the first component
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Primitive(s) if !s.trim().is_empty() => Some(s.as_str()),
            Self::Primitive(_) => None,
            Self::Composite(parts) => parts.first().and_then(Hl7Type::text),
        }
    }

    /// Component by 1-based index
    ///
    /// Component 1 of a primitive is the primitive itself, which mirrors how
    /// a field declared as composite but sent without separators is read.
    pub fn component(&self, index: usize) -> Option<&Hl7Type> {
        match self {
            Self::Composite(parts) => index.checked_sub(1).and_then(|i| parts.get(i)),
            Self::Primitive(_) if index == 1 => Some(self),
            Self::Primitive(_) => None,
        }
    }

    /// Number of components (1 for primitives)
    pub fn len(&self) -> usize {
        match self {
            Self::Composite(parts) => parts.len(),
            Self::Primitive(_) => 1,
        }
    }

    /// Wire form of the value under `delimiters`, with text re-escaped
    pub fn encode(&self, delimiters: &Delimiters) -> String {
        let mut out = String::new();
        self.encode_into(&mut out, delimiters, 0);
        out
    }

    fn encode_into(&self, out: &mut String, delimiters: &Delimiters, level: usize) {
        match self {
            Self::Primitive(s) => out.push_str(&escape(s, delimiters)),
            Self::Composite(parts) => {
                let separator = if level == 0 {
                    delimiters.component
                } else {
                    delimiters.sub_component
                };
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push(separator);
                    }
                    part.encode_into(out, delimiters, level + 1);
                }
            }
        }
    }
}

/// Canonical form: the standard `|^~\&` delimiters, whatever the source used
impl fmt::Display for Hl7Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode(&Delimiters::default()))
    }
}

/// One field of a segment, holding its repetitions in document order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Field {
    pub repetitions: Vec<Hl7Type>,
}

impl Field {
    pub fn new(repetitions: Vec<Hl7Type>) -> Self {
        Self { repetitions }
    }

    pub fn is_empty(&self) -> bool {
        self.repetitions.iter().all(Hl7Type::is_empty)
    }
}

/// A named segment with 1-based field access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Segment {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field by 1-based index
    pub fn field(&self, index: usize) -> Option<&Field> {
        index.checked_sub(1).and_then(|i| self.fields.get(i))
    }

    /// Wire form of the segment under `delimiters`
    ///
    /// MSH-1 and MSH-2 are written as the delimiters themselves.
    pub fn encode(&self, delimiters: &Delimiters) -> String {
        let mut out = self.name.clone();
        let header = self.name == "MSH";
        for (i, field) in self.fields.iter().enumerate() {
            match i {
                0 if header => out.push(delimiters.field),
                1 if header => out.push_str(&delimiters.encoding_characters()),
                _ => {
                    out.push(delimiters.field);
                    for (r, rep) in field.repetitions.iter().enumerate() {
                        if r > 0 {
                            out.push(delimiters.repetition);
                        }
                        rep.encode_into(&mut out, delimiters, 0);
                    }
                }
            }
        }
        out
    }

    /// Repetitions of a field, empty when the field is absent
    pub fn repetitions(&self, index: usize) -> &[Hl7Type] {
        self.field(index)
            .map(|f| f.repetitions.as_slice())
            .unwrap_or(&[])
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode(&Delimiters::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_of_primitive() {
        let value = Hl7Type::primitive("1234");
        assert_eq!(value.component(1), Some(&value));
        assert_eq!(value.component(2), None);
        assert_eq!(value.component(0), None);
    }

    #[test]
    fn test_composite_text_and_emptiness() {
        let value = Hl7Type::Composite(vec![
            Hl7Type::primitive(""),
            Hl7Type::primitive("x"),
        ]);
        assert!(!value.is_empty());
        assert_eq!(value.text(), None);
        assert_eq!(value.to_string(), "^x");
    }

    #[test]
    fn test_display_escapes_delimiters() {
        let value = Hl7Type::Composite(vec![
            Hl7Type::primitive("a^b"),
            Hl7Type::Composite(vec![Hl7Type::primitive("c"), Hl7Type::primitive("d|e")]),
        ]);
        assert_eq!(value.to_string(), "a\\S\\b^c&d\\F\\e");
    }
}
