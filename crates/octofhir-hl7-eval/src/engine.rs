//! Mapping evaluation engine
//!
//! This module provides [`MappingEngine`], which evaluates compiled templates
//! against a message accessor and an evaluation context.
//!
//! Each expression goes through the same steps: its condition is tested (a
//! false condition ends evaluation before any message access), its variables
//! are resolved into the context, its sources are tried left to right and
//! each candidate is converted according to the expression kind.

use crate::context::{DEFAULT_MAX_DEPTH, EvaluationContext, reference_key};
use crate::datatype::DataTypeConverter;
use crate::error::{EvalError, EvalResult};
use crate::expression::{Expression, ExpressionKind};
use crate::specification::select_candidates;
use crate::template::{ResourceTemplate, TemplateRegistry};
use crate::terminology::TerminologyResolver;
use chrono::FixedOffset;
use indexmap::IndexMap;
use octofhir_hl7_types::{EvaluationResult, InputDataExtractor, Value};
use std::sync::Arc;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum template nesting depth
    pub max_depth: usize,
    /// Offset for date-times sent without one
    pub default_offset: Option<FixedOffset>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            default_offset: None,
        }
    }
}

impl EngineConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_default_offset(mut self, offset: FixedOffset) -> Self {
        self.default_offset = Some(offset);
        self
    }
}

/// The mapping evaluation engine
///
/// Templates and terminology are shared read-only, so one engine can serve
/// many conversions, also from several threads.
#[derive(Debug, Clone)]
pub struct MappingEngine {
    templates: Arc<TemplateRegistry>,
    converter: DataTypeConverter,
    config: EngineConfig,
}

impl MappingEngine {
    /// Create an engine over a template registry and terminology
    pub fn new(templates: Arc<TemplateRegistry>, terminology: TerminologyResolver) -> Self {
        Self {
            templates,
            converter: DataTypeConverter::new(terminology),
            config: EngineConfig::default(),
        }
    }

    /// Apply engine settings
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.converter = self.converter.with_default_offset(config.default_offset);
        self.config = config;
        self
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn converter(&self) -> &DataTypeConverter {
        &self.converter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fresh context for one conversion
    pub fn new_context(&self) -> EvaluationContext {
        EvaluationContext::with_max_depth(self.config.max_depth)
    }

    /// Evaluate one expression
    ///
    /// Returns `None` when the expression produces nothing: condition false,
    /// no source yields a value, or every candidate fails conversion.
    pub fn evaluate(
        &self,
        expr: &Expression,
        ctx: &mut EvaluationContext,
        accessor: &dyn InputDataExtractor,
        base: Option<&Value>,
    ) -> EvalResult<Option<EvaluationResult>> {
        let mut resolved = Vec::new();

        if let Some(condition) = &expr.condition {
            // Own variables named by the condition are needed to test it
            let names = condition.variables();
            for variable in expr.variables.iter().filter(|v| names.contains(&v.name())) {
                let value = variable.extract_variable_value(ctx, accessor, base, &self.converter)?;
                ctx.bind(variable.name(), value.as_ref());
                resolved.push(variable.name());
            }
            if !condition.test(ctx) {
                log::debug!("Condition '{}' is false, skipping", condition);
                return Ok(None);
            }
        }

        for variable in &expr.variables {
            if resolved.contains(&variable.name()) {
                continue;
            }
            let value = variable.extract_variable_value(ctx, accessor, base, &self.converter)?;
            ctx.bind(variable.name(), value.as_ref());
        }

        let result = match &expr.kind {
            ExpressionKind::Literal(value) if expr.specs.is_empty() => {
                EvaluationResult::Scalar(value.clone())
            }
            _ => self.extract(expr, ctx, accessor, base)?,
        };

        Ok((!result.is_empty()).then_some(result))
    }

    /// Try each source in order; the first non-empty result wins
    fn extract(
        &self,
        expr: &Expression,
        ctx: &mut EvaluationContext,
        accessor: &dyn InputDataExtractor,
        base: Option<&Value>,
    ) -> EvalResult<EvaluationResult> {
        if expr.specs.is_empty() {
            let candidates = base.filter(|v| !v.is_empty()).cloned().into_iter().collect();
            return select_candidates(candidates, expr.generate_list, |value| {
                self.convert_candidate(expr, value, ctx, accessor)
            });
        }

        for source in &expr.specs {
            let multiple = expr.generate_list || source.is_multiple();
            let candidates = source.candidates(ctx, accessor, base)?;
            let result = select_candidates(candidates, multiple, |value| {
                self.convert_candidate(expr, value, ctx, accessor)
            })?;
            if !result.is_empty() {
                return Ok(result);
            }
        }
        Ok(EvaluationResult::Empty)
    }

    fn convert_candidate(
        &self,
        expr: &Expression,
        value: &Value,
        ctx: &mut EvaluationContext,
        accessor: &dyn InputDataExtractor,
    ) -> EvalResult<Option<Value>> {
        match &expr.kind {
            ExpressionKind::Value { data_type, table } => {
                Ok(self.converter.convert(value, *data_type, table.as_deref()))
            }
            ExpressionKind::CodeableConcept { table } => {
                Ok(self.converter.codeable_concept(value, table.as_deref()))
            }
            ExpressionKind::Resource { template } => {
                self.evaluate_template(template, ctx, accessor, Some(value))
            }
            ExpressionKind::Reference { template } => {
                self.evaluate_reference(template, ctx, accessor, value)
            }
            ExpressionKind::Literal(literal) => Ok(Some(literal.clone())),
        }
    }

    /// Evaluate a registered template by name
    pub fn evaluate_template(
        &self,
        name: &str,
        ctx: &mut EvaluationContext,
        accessor: &dyn InputDataExtractor,
        base: Option<&Value>,
    ) -> EvalResult<Option<Value>> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| EvalError::unknown_template(name))?;
        self.evaluate_resource(template, ctx, accessor, base)
    }

    /// Evaluate a template into an object
    ///
    /// Children are evaluated in declaration order and each result is bound in
    /// the context under the child's name. The object is absent when a required
    /// child is absent or when no child produced a value; resources referenced
    /// while assembling an absent object are discarded.
    pub fn evaluate_resource(
        &self,
        template: &ResourceTemplate,
        ctx: &mut EvaluationContext,
        accessor: &dyn InputDataExtractor,
        base: Option<&Value>,
    ) -> EvalResult<Option<Value>> {
        if !ctx.enter_recursion() {
            return Err(EvalError::RecursionLimit {
                depth: ctx.max_depth(),
            });
        }
        let checkpoint = ctx.checkpoint();
        let result = self.assemble(template, ctx, accessor, base);
        ctx.exit_recursion();
        if let Ok(None) = result {
            // Resources referenced only from the dropped object go with it
            ctx.rollback(checkpoint);
        }
        result
    }

    fn assemble(
        &self,
        template: &ResourceTemplate,
        ctx: &mut EvaluationContext,
        accessor: &dyn InputDataExtractor,
        base: Option<&Value>,
    ) -> EvalResult<Option<Value>> {
        let mut fields = IndexMap::new();
        if let Some(resource_type) = template.resource_type() {
            fields.insert("resourceType".to_string(), Value::string(resource_type));
        }

        let mut populated = 0;
        for (name, expr) in template.expressions() {
            let result = self.evaluate(expr, ctx, accessor, base)?;
            ctx.bind(name, result.as_ref());
            match result.and_then(EvaluationResult::into_value) {
                Some(value) => {
                    fields.insert(name.clone(), value);
                    populated += 1;
                }
                None if expr.required => {
                    log::debug!(
                        "Required '{}' is missing, dropping {}",
                        name,
                        template.name()
                    );
                    return Ok(None);
                }
                None => {}
            }
        }

        Ok((populated > 0).then_some(Value::Object(fields)))
    }

    /// Evaluate a resource template into a resource with an id
    ///
    /// The resource gets the next id of this conversion and its reference
    /// (`Type/id`) is cached, so reference expressions over the same template
    /// and source point at it instead of creating a copy.
    pub fn evaluate_identified(
        &self,
        name: &str,
        ctx: &mut EvaluationContext,
        accessor: &dyn InputDataExtractor,
        base: &Value,
    ) -> EvalResult<Option<(Value, String)>> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| EvalError::unknown_template(name))?;
        let Some(Value::Object(mut resource)) = self.evaluate_resource(template, ctx, accessor, Some(base))?
        else {
            return Ok(None);
        };

        let resource_type = template
            .resource_type()
            .map(str::to_string)
            .unwrap_or_else(|| name.rsplit('/').next().unwrap_or(name).to_string());
        let id = ctx.next_resource_id();
        let position = usize::from(resource.contains_key("resourceType"));
        resource.shift_insert(position, "id".to_string(), Value::string(&id));

        let reference = format!("{}/{}", resource_type, id);
        ctx.cache_reference(reference_key(name, base), reference.clone());
        Ok(Some((Value::Object(resource), reference)))
    }

    /// Evaluate a resource template for a reference
    ///
    /// The resource is collected in the context and the returned value is
    /// `{reference: "Type/id"}`. A source already referenced in this
    /// conversion reuses its reference.
    fn evaluate_reference(
        &self,
        name: &str,
        ctx: &mut EvaluationContext,
        accessor: &dyn InputDataExtractor,
        base: &Value,
    ) -> EvalResult<Option<Value>> {
        if let Some(reference) = ctx.cached_reference(&reference_key(name, base)) {
            return Ok(Some(reference_value(reference)));
        }
        let Some((resource, reference)) = self.evaluate_identified(name, ctx, accessor, base)? else {
            return Ok(None);
        };
        ctx.add_referenced_resource(resource);
        Ok(Some(reference_value(&reference)))
    }
}

fn reference_value(reference: &str) -> Value {
    Value::object([("reference", Value::string(reference))])
}
