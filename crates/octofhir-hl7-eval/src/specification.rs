//! Path specifications into HL7 messages
//!
//! A specification such as `PID.3.4:STRING*` names a segment (or an HL7 data
//! type, for paths relative to the current base value), up to three 1-based
//! indices, an optional target data type and an optional multiplicity marker.
//! Specifications are parsed once when templates load.

use crate::context::{EvaluationContext, normalize_name};
use crate::datatype::DataTypeConverter;
use crate::error::{EvalError, EvalResult};
use crate::parser::parse_spec;
use octofhir_hl7_types::{DataType, EvaluationResult, InputDataExtractor, Segment, Value};
use std::fmt;

/// HL7 data type identifiers; a path starting with one of these is read
/// relative to the base value instead of from a segment
const HL7_DATA_TYPES: &[&str] = &[
    "AD", "CE", "CF", "CK", "CM", "CN", "CNE", "CP", "CQ", "CWE", "CX", "DLN", "DR", "DT", "DTM",
    "ED", "EI", "EIP", "FC", "FN", "FT", "HD", "ID", "IS", "JCC", "MO", "MSG", "NM", "PL", "PN",
    "PT", "RP", "SAD", "SI", "SN", "SPS", "ST", "TM", "TQ", "TS", "TX", "VID", "XAD", "XCN",
    "XON", "XPN", "XTN",
];

/// Whether a name is an HL7 data type identifier
pub fn is_hl7_data_type(name: &str) -> bool {
    HL7_DATA_TYPES.contains(&name)
}

/// Parsed path specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specification {
    text: String,
    name: String,
    indices: Vec<usize>,
    data_type: Option<DataType>,
    extract_multiple: bool,
    relative: bool,
}

impl Specification {
    /// Parse a specification
    ///
    /// `extract_multiple` is the default multiplicity; a trailing `*` turns it
    /// on unless `force_single` is set.
    pub fn parse(text: &str, extract_multiple: bool, force_single: bool) -> EvalResult<Self> {
        let raw = parse_spec(text).map_err(|e| EvalError::malformed_spec(text, e))?;
        let relative = is_hl7_data_type(&raw.name);

        if raw.indices.contains(&0) {
            return Err(EvalError::malformed_spec(text, "indices are 1-based"));
        }
        if relative && raw.indices.len() > 2 {
            return Err(EvalError::malformed_spec(
                text,
                "a data type path addresses at most a component and sub-component",
            ));
        }

        let data_type = raw
            .data_type
            .as_deref()
            .map(str::parse::<DataType>)
            .transpose()?;

        Ok(Self {
            text: text.trim().to_string(),
            name: raw.name,
            indices: raw.indices,
            data_type,
            extract_multiple: (extract_multiple || raw.multiple) && !force_single,
            relative,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Segment id or data type identifier
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    pub fn is_multiple(&self) -> bool {
        self.extract_multiple
    }

    /// True when the path is read relative to the base value
    pub fn is_relative(&self) -> bool {
        self.relative
    }

    /// Extract and convert the value this specification points at
    ///
    /// Without a data type the raw value is returned.
    pub fn extract_value_for_spec(
        &self,
        accessor: &dyn InputDataExtractor,
        base: Option<&Value>,
        converter: &DataTypeConverter,
    ) -> EvalResult<EvaluationResult> {
        let data_type = self.data_type.unwrap_or(DataType::Object);
        self.extract_with(accessor, base, self.extract_multiple, |value| {
            Ok(converter.convert(value, data_type, None))
        })
    }

    /// Extract with a caller-provided conversion
    ///
    /// A candidate whose conversion yields `None` is skipped.
    pub fn extract_with<F>(
        &self,
        accessor: &dyn InputDataExtractor,
        base: Option<&Value>,
        multiple: bool,
        convert: F,
    ) -> EvalResult<EvaluationResult>
    where
        F: FnMut(&Value) -> EvalResult<Option<Value>>,
    {
        let candidates = self.candidates(accessor, base)?;
        select_candidates(candidates, multiple, convert)
    }

    /// Raw non-blank values addressed by the path, in document order
    pub fn candidates(
        &self,
        accessor: &dyn InputDataExtractor,
        base: Option<&Value>,
    ) -> EvalResult<Vec<Value>> {
        let wrap = |e| EvalError::data_extraction(&self.text, e);

        let values: Vec<Value> = if self.relative {
            let Some(Value::Type(base)) = base else {
                return Ok(Vec::new());
            };
            match self.indices.as_slice() {
                [] => vec![base.clone()],
                [component] => accessor.get_component(base, *component).map_err(wrap)?.into_iter().collect(),
                [component, sub] => accessor
                    .get_sub_component(base, *component, *sub)
                    .map_err(wrap)?
                    .into_iter()
                    .collect(),
                _ => Vec::new(),
            }
            .into_iter()
            .map(Value::Type)
            .collect()
        } else {
            let segments = self.segments(accessor, base)?;
            let Some((field, rest)) = self.indices.split_first() else {
                return Ok(segments.into_iter().map(Value::Segment).collect());
            };
            let Some(segment) = segments.first() else {
                return Ok(Vec::new());
            };

            let mut values = Vec::new();
            for repetition in accessor.get_types(segment, *field).map_err(wrap)? {
                let value = match rest {
                    [] => Some(repetition),
                    [component] => accessor.get_component(&repetition, *component).map_err(wrap)?,
                    [component, sub] => accessor
                        .get_sub_component(&repetition, *component, *sub)
                        .map_err(wrap)?,
                    _ => None,
                };
                values.extend(value.map(Value::Type));
            }
            values
        };

        Ok(values.into_iter().filter(|v| !v.is_empty()).collect())
    }

    fn segments(
        &self,
        accessor: &dyn InputDataExtractor,
        base: Option<&Value>,
    ) -> EvalResult<Vec<Segment>> {
        if let Some(Value::Segment(segment)) = base {
            if segment.name() == self.name {
                return Ok(vec![segment.clone()]);
            }
        }
        let wrap = |e| EvalError::data_extraction(&self.text, e);
        if self.indices.is_empty() && self.extract_multiple {
            return accessor.get_all_structures(&self.name).map_err(wrap);
        }
        Ok(accessor
            .get_structure(&self.name, 0)
            .map_err(wrap)?
            .into_iter()
            .collect())
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Pick converted candidates
///
/// Single: the first candidate that converts, later ones are never touched.
/// Multiple: every candidate that converts, in order.
pub(crate) fn select_candidates<F>(
    candidates: Vec<Value>,
    multiple: bool,
    mut convert: F,
) -> EvalResult<EvaluationResult>
where
    F: FnMut(&Value) -> EvalResult<Option<Value>>,
{
    let mut converted = Vec::new();
    for (index, candidate) in candidates.iter().enumerate() {
        match convert(candidate)? {
            Some(value) => {
                converted.push(value);
                if !multiple {
                    break;
                }
            }
            None => log::debug!("Skipping candidate {} ({})", index, candidate.kind()),
        }
    }
    Ok(EvaluationResult::from_values(converted, multiple))
}

/// One entry of a fallback list: a context variable or a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    VariableRef(String),
    Path(Specification),
}

impl SpecSource {
    /// Parse one entry; `$name` refers to a context variable
    pub fn parse(text: &str, extract_multiple: bool, force_single: bool) -> EvalResult<Self> {
        let trimmed = text.trim();
        if trimmed.starts_with('$') {
            let name = normalize_name(trimmed);
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(EvalError::malformed_spec(text, "invalid variable reference"));
            }
            return Ok(Self::VariableRef(name.to_string()));
        }
        Specification::parse(trimmed, extract_multiple, force_single).map(Self::Path)
    }

    /// Parse a `|`-separated fallback list, keeping its order
    pub fn parse_list(text: &str, extract_multiple: bool, force_single: bool) -> EvalResult<Vec<Self>> {
        if text.trim().is_empty() {
            return Err(EvalError::malformed_spec(text, "empty specification"));
        }
        text.split('|')
            .map(|entry| Self::parse(entry, extract_multiple, force_single))
            .collect()
    }

    /// Whether the entry requests multiple values
    pub fn is_multiple(&self) -> bool {
        match self {
            Self::VariableRef(_) => false,
            Self::Path(spec) => spec.is_multiple(),
        }
    }

    /// Raw candidates from the context or the message
    pub fn candidates(
        &self,
        ctx: &EvaluationContext,
        accessor: &dyn InputDataExtractor,
        base: Option<&Value>,
    ) -> EvalResult<Vec<Value>> {
        match self {
            Self::VariableRef(name) => Ok(ctx
                .get_local(name)
                .map(|result| result.values().iter().filter(|v| !v.is_empty()).cloned().collect())
                .unwrap_or_default()),
            Self::Path(spec) => spec.candidates(accessor, base),
        }
    }
}

impl fmt::Display for SpecSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VariableRef(name) => write!(f, "${}", name),
            Self::Path(spec) => write!(f, "{}", spec),
        }
    }
}
