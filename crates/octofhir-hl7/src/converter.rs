//! Message to FHIR bundle conversion
//!
//! A conversion parses the raw message, picks the message template named
//! after MSH-9 (`ADT^A01` uses `message/ADT_A01`), evaluates every resource the
//! template lists against its segment and collects the results, followed by
//! the resources created through reference expressions, into a `Bundle` of
//! type `collection`.

use crate::builtin;
use crate::error::{ConversionError, ConversionResult};
use chrono::FixedOffset;
use octofhir_hl7_eval::template::MESSAGE_TEMPLATE_PREFIX;
use octofhir_hl7_eval::{
    EngineConfig, EvalError, EvaluationContext, EvaluationResult, Hl7DataExtractor,
    InMemoryTerminology, InputDataExtractor, MappingEngine, MessageResource, TemplateRegistry,
    TerminologyResolver, Value,
};
use octofhir_hl7_message::Message;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

/// Name of the message template for a message type (`ADT^A01` -> `message/ADT_A01`)
pub fn message_template_name(message_type: &str) -> String {
    format!("{}{}", MESSAGE_TEMPLATE_PREFIX, message_type.trim().replace('^', "_"))
}

/// Builder for [`Hl7ToFhirConverter`]
#[derive(Debug, Clone)]
pub struct ConverterBuilder {
    template_dirs: Vec<PathBuf>,
    terminology_files: Vec<PathBuf>,
    builtin: bool,
    config: EngineConfig,
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self {
            template_dirs: Vec::new(),
            terminology_files: Vec::new(),
            builtin: true,
            config: EngineConfig::default(),
        }
    }
}

impl ConverterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template directory; its templates replace built-ins of the same name
    pub fn with_templates(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dirs.push(dir.into());
        self
    }

    /// Add a code table file, merged over the built-in tables
    pub fn with_terminology(mut self, path: impl Into<PathBuf>) -> Self {
        self.terminology_files.push(path.into());
        self
    }

    /// Start from an empty template and table set
    pub fn without_builtins(mut self) -> Self {
        self.builtin = false;
        self
    }

    pub fn with_default_offset(mut self, offset: FixedOffset) -> Self {
        self.config = self.config.with_default_offset(offset);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config = self.config.with_max_depth(max_depth);
        self
    }

    /// Load and validate all templates and tables
    pub fn build(self) -> ConversionResult<Hl7ToFhirConverter> {
        let mut registry = if self.builtin {
            builtin::templates()?
        } else {
            TemplateRegistry::new()
        };
        for dir in &self.template_dirs {
            registry.extend_from_dir(dir)?;
        }
        registry.validate()?;

        let mut terminology = if self.builtin {
            builtin::terminology()?
        } else {
            InMemoryTerminology::new()
        };
        for path in &self.terminology_files {
            terminology.merge(InMemoryTerminology::from_file(path)?);
            log::info!("Loaded code tables from {}", path.display());
        }

        let engine = MappingEngine::new(
            Arc::new(registry),
            TerminologyResolver::new(Arc::new(terminology)),
        )
        .with_config(self.config);
        Ok(Hl7ToFhirConverter::from_engine(engine))
    }
}

/// Converts HL7 v2 messages into FHIR bundles
///
/// The converter is immutable once built; each call to [`convert`] uses its
/// own evaluation context, so one converter can be shared between threads.
///
/// [`convert`]: Hl7ToFhirConverter::convert
#[derive(Debug, Clone)]
pub struct Hl7ToFhirConverter {
    engine: MappingEngine,
}

impl Hl7ToFhirConverter {
    /// Converter over the built-in templates and tables
    pub fn new() -> ConversionResult<Self> {
        ConverterBuilder::new().build()
    }

    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::new()
    }

    pub fn from_engine(engine: MappingEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &MappingEngine {
        &self.engine
    }

    /// Convert raw message text into a `Bundle`
    pub fn convert(&self, text: &str) -> ConversionResult<serde_json::Value> {
        let message = octofhir_hl7_message::parse(text)?;
        self.convert_message(message)
    }

    /// Convert a parsed message into a `Bundle`
    pub fn convert_message(&self, message: Message) -> ConversionResult<serde_json::Value> {
        let resources = self.convert_resources(message)?;
        Ok(bundle(&resources))
    }

    /// Resources produced for a message, in bundle order
    pub fn convert_resources(&self, message: Message) -> ConversionResult<Vec<Value>> {
        let accessor = Hl7DataExtractor::new(message);
        let message_type = accessor
            .get_message_type()
            .map_err(|e| EvalError::data_extraction("MSH.9", e))?
            .ok_or(ConversionError::MissingMessageType)?;
        let template_name = message_template_name(&message_type);
        let template = self
            .engine
            .templates()
            .message(&template_name)
            .ok_or_else(|| ConversionError::unsupported(&message_type, &template_name))?;
        log::debug!("Converting {} with '{}'", message_type, template_name);

        let mut ctx = self.engine.new_context();
        let mut resources = Vec::new();
        for entry in &template.resources {
            let produced = self.convert_entry(entry, &mut ctx, &accessor)?;
            ctx.set_local(
                &entry.resource_name,
                EvaluationResult::from_values(produced.clone(), entry.repeats),
            );
            resources.extend(produced);
        }

        let referenced = ctx.take_referenced_resources();
        log::debug!(
            "Produced {} resources and {} referenced resources",
            resources.len(),
            referenced.len()
        );
        resources.extend(referenced);
        Ok(resources)
    }

    fn convert_entry(
        &self,
        entry: &MessageResource,
        ctx: &mut EvaluationContext,
        accessor: &Hl7DataExtractor,
    ) -> ConversionResult<Vec<Value>> {
        let segments = accessor
            .get_all_structures(&entry.segment)
            .map_err(|e| EvalError::data_extraction(&entry.segment, e))?;
        if segments.is_empty() {
            log::debug!(
                "No {} segment, skipping {}",
                entry.segment,
                entry.resource_name
            );
            return Ok(Vec::new());
        }

        let count = if entry.repeats { segments.len() } else { 1 };
        let mut produced = Vec::new();
        for segment in segments.into_iter().take(count) {
            let base = Value::Segment(segment);
            match self
                .engine
                .evaluate_identified(&entry.resource_path, ctx, accessor, &base)?
            {
                Some((resource, reference)) => {
                    log::debug!("Created {}", reference);
                    produced.push(resource);
                }
                None => log::warn!(
                    "{} segment produced no {} resource",
                    entry.segment,
                    entry.resource_name
                ),
            }
        }
        Ok(produced)
    }
}

fn bundle(resources: &[Value]) -> serde_json::Value {
    let entries: Vec<_> = resources
        .iter()
        .map(|resource| json!({ "resource": resource.to_json() }))
        .collect();
    json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": entries,
    })
}
