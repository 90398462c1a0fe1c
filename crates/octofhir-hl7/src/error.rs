//! Conversion errors

use octofhir_hl7_eval::EvalError;
use octofhir_hl7_message::ParseError;
use thiserror::Error;

/// Result type for message conversion
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Errors raised while converting a message into a bundle
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The raw message could not be split into segments
    #[error("Failed to parse message: {0}")]
    Parse(#[from] ParseError),

    /// Template loading or evaluation failed
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// MSH-9 does not name a message type
    #[error("Message header has no message type (MSH-9)")]
    MissingMessageType,

    /// No message template exists for the message type
    #[error("Unsupported message type '{message_type}' (no template '{template}')")]
    UnsupportedMessageType {
        message_type: String,
        template: String,
    },
}

impl ConversionError {
    pub fn unsupported(message_type: impl Into<String>, template: impl Into<String>) -> Self {
        Self::UnsupportedMessageType {
            message_type: message_type.into(),
            template: template.into(),
        }
    }
}
