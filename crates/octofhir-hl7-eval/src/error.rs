//! Errors for template compilation and evaluation

use octofhir_hl7_types::DataExtractionError;
use thiserror::Error;

/// Result type for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that can occur while loading templates or evaluating them
///
/// Malformed template errors are raised at load time and abort the load.
/// At evaluation time only accessor failures and recursion overflow are
/// errors; everything else degrades to an absent value.
#[derive(Debug, Error, Clone)]
pub enum EvalError {
    /// Unparseable path specification
    #[error("Malformed specification '{spec}': {message}")]
    MalformedSpecification { spec: String, message: String },

    /// Unparseable condition
    #[error("Malformed condition '{condition}': {message}")]
    MalformedCondition { condition: String, message: String },

    /// Variable declared without usable sources
    #[error("Malformed variable '{name}': {message}")]
    MalformedVariable { name: String, message: String },

    /// Expression definition missing or combining attributes
    #[error("Malformed expression '{name}': {message}")]
    MalformedExpression { name: String, message: String },

    /// Unknown data type identifier
    #[error("Unknown data type: {name}")]
    UnknownDataType { name: String },

    /// Reference to a template that is not registered
    #[error("Unknown template: {name}")]
    UnknownTemplate { name: String },

    /// Template or terminology file could not be read or deserialized
    #[error("Failed to load '{source_name}': {message}")]
    TemplateLoad { source_name: String, message: String },

    /// Message access failed for a field
    #[error("Data extraction failed for '{path}': {source}")]
    DataExtraction {
        path: String,
        #[source]
        source: DataExtractionError,
    },

    /// Maximum template nesting depth exceeded
    #[error("Maximum recursion depth of {depth} exceeded")]
    RecursionLimit { depth: usize },
}

impl EvalError {
    /// Create a malformed specification error
    pub fn malformed_spec(spec: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedSpecification {
            spec: spec.into(),
            message: message.into(),
        }
    }

    /// Create a malformed condition error
    pub fn malformed_condition(condition: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedCondition {
            condition: condition.into(),
            message: message.into(),
        }
    }

    /// Create a malformed variable error
    pub fn malformed_variable(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedVariable {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a malformed expression error
    pub fn malformed_expression(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedExpression {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an unknown template error
    pub fn unknown_template(name: impl Into<String>) -> Self {
        Self::UnknownTemplate { name: name.into() }
    }

    /// Create a template load error
    pub fn template_load(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::TemplateLoad {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Wrap an accessor failure with the path being extracted
    pub fn data_extraction(path: impl Into<String>, source: DataExtractionError) -> Self {
        Self::DataExtraction {
            path: path.into(),
            source,
        }
    }

    /// True for errors raised while loading templates
    pub fn is_template_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedSpecification { .. }
                | Self::MalformedCondition { .. }
                | Self::MalformedVariable { .. }
                | Self::MalformedExpression { .. }
                | Self::UnknownDataType { .. }
                | Self::UnknownTemplate { .. }
                | Self::TemplateLoad { .. }
        )
    }
}

impl From<octofhir_hl7_types::UnknownDataTypeError> for EvalError {
    fn from(err: octofhir_hl7_types::UnknownDataTypeError) -> Self {
        Self::UnknownDataType { name: err.0 }
    }
}
