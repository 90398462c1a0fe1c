//! Named variables with ordered fallback sources

use crate::context::{EvaluationContext, normalize_name};
use crate::datatype::DataTypeConverter;
use crate::error::{EvalError, EvalResult};
use crate::specification::SpecSource;
use octofhir_hl7_types::{EvaluationResult, InputDataExtractor, Value};

/// A variable declared on an expression
///
/// Sources are tried left to right; the first one producing a non-empty
/// result wins and the rest are never evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    sources: Vec<SpecSource>,
    extract_multiple: bool,
}

impl Variable {
    pub fn new(name: &str, sources: Vec<SpecSource>, extract_multiple: bool) -> Self {
        Self {
            name: normalize_name(name).to_string(),
            sources,
            extract_multiple,
        }
    }

    /// Parse a variable from its `|`-separated fallback text
    pub fn parse(name: &str, specs: &str, extract_multiple: bool) -> EvalResult<Self> {
        if normalize_name(name).is_empty() {
            return Err(EvalError::malformed_variable(name, "variable name is empty"));
        }
        let sources = SpecSource::parse_list(specs, extract_multiple, false)
            .map_err(|e| EvalError::malformed_variable(name, e.to_string()))?;
        Ok(Self::new(name, sources, extract_multiple))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[SpecSource] {
        &self.sources
    }

    pub fn is_multiple(&self) -> bool {
        self.extract_multiple
    }

    /// Resolve the variable
    ///
    /// `None` only when the variable has no sources at all; when every source
    /// comes up empty the result is `Some(Empty)`.
    pub fn extract_variable_value(
        &self,
        ctx: &EvaluationContext,
        accessor: &dyn InputDataExtractor,
        base: Option<&Value>,
        converter: &DataTypeConverter,
    ) -> EvalResult<Option<EvaluationResult>> {
        if self.sources.is_empty() {
            return Ok(None);
        }

        for source in &self.sources {
            let result = match source {
                SpecSource::VariableRef(name) => ctx.get_local(name).cloned().unwrap_or_default(),
                SpecSource::Path(spec) => spec.extract_value_for_spec(accessor, base, converter)?,
            };
            if !result.is_empty() {
                log::debug!("Variable '{}' resolved from {}", self.name, source);
                return Ok(Some(result));
            }
        }

        Ok(Some(EvaluationResult::Empty))
    }
}
