//! Message parsing errors

use thiserror::Error;

/// Result type for message parsing
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors raised while splitting a raw HL7 v2 message
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input contains no segments
    #[error("Empty message")]
    EmptyMessage,

    /// The first segment is not an MSH header
    #[error("Message must start with an MSH segment, found '{found}'")]
    MissingHeader { found: String },

    /// MSH-1/MSH-2 do not declare usable delimiters
    #[error("Invalid encoding characters: {message}")]
    InvalidEncodingCharacters { message: String },

    /// A segment id is not three alphanumeric characters
    #[error("Invalid segment name '{name}' on line {line}")]
    InvalidSegmentName { name: String, line: usize },
}

impl ParseError {
    /// Create an invalid encoding characters error
    pub fn invalid_encoding(message: impl Into<String>) -> Self {
        Self::InvalidEncodingCharacters {
            message: message.into(),
        }
    }

    /// Create an invalid segment name error
    pub fn invalid_segment(name: impl Into<String>, line: usize) -> Self {
        Self::InvalidSegmentName {
            name: name.into(),
            line,
        }
    }
}
