//! YAML mapping templates
//!
//! Templates are compiled into [`Expression`] trees when they are loaded, so a
//! malformed specification, condition or variable fails the load instead of a
//! conversion.
//!
//! Resource template (`resource/Patient.yml`, `datatype/Identifier.yml`):
//!
//! ```yaml
//! resourceType: Patient
//! expressions:
//!   identifier:
//!     valueOf: datatype/Identifier
//!     specs: PID.3
//!     generateList: true
//!   gender:
//!     type: STRING
//!     specs: PID.8
//! ```
//!
//! Message template (`message/ADT_A01.yml`):
//!
//! ```yaml
//! resources:
//!   - resourceName: Patient
//!     segment: PID
//!     resourcePath: resource/Patient
//! ```

use crate::condition::Condition;
use crate::error::{EvalError, EvalResult};
use crate::expression::{Expression, ExpressionKind};
use crate::specification::SpecSource;
use crate::variable::Variable;
use indexmap::IndexMap;
use octofhir_hl7_types::{DataType, Value};
use serde::{Deserialize, Serialize};
use std::path::Path;
use walkdir::WalkDir;

/// Prefix of template names holding message templates
pub const MESSAGE_TEMPLATE_PREFIX: &str = "message/";

const CODEABLE_CONCEPT_TYPE: &str = "CODEABLE_CONCEPT";

/// Expression kind named explicitly in a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpressionType {
    Value,
    Resource,
    Reference,
    CodeableConcept,
    Literal,
}

/// Variable declaration: a fallback string or a detailed form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableDef {
    Specs(String),
    #[serde(rename_all = "camelCase")]
    Detailed {
        specs: String,
        #[serde(default)]
        extract_multiple: bool,
    },
}

/// Expression as written in YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExpressionDef {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub vars: IndexMap<String, VariableDef>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub generate_list: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression_type: Option<ExpressionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl ExpressionDef {
    /// Compile into an expression
    pub fn compile(&self, name: &str) -> EvalResult<Expression> {
        let kind = self.kind(name)?;

        let specs = match &self.specs {
            Some(specs) => SpecSource::parse_list(specs, false, false)?,
            None => Vec::new(),
        };
        let condition = self.condition.as_deref().map(Condition::parse).transpose()?;
        let variables = self
            .vars
            .iter()
            .map(|(var_name, def)| match def {
                VariableDef::Specs(specs) => Variable::parse(var_name, specs, false),
                VariableDef::Detailed {
                    specs,
                    extract_multiple,
                } => Variable::parse(var_name, specs, *extract_multiple),
            })
            .collect::<EvalResult<Vec<_>>>()?;

        Ok(Expression {
            kind,
            specs,
            condition,
            variables,
            required: self.required,
            generate_list: self.generate_list,
        })
    }

    fn kind(&self, name: &str) -> EvalResult<ExpressionKind> {
        if self.value.is_some() && self.value_of.is_some() {
            return Err(EvalError::malformed_expression(
                name,
                "'value' and 'valueOf' cannot be combined",
            ));
        }

        let expression_type = self.expression_type.unwrap_or_else(|| self.inferred_type());
        match expression_type {
            ExpressionType::Literal => {
                let value = self
                    .value
                    .as_ref()
                    .and_then(Value::from_json)
                    .ok_or_else(|| EvalError::malformed_expression(name, "literal without 'value'"))?;
                Ok(ExpressionKind::Literal(value))
            }
            ExpressionType::Resource => Ok(ExpressionKind::Resource {
                template: self.template(name)?,
            }),
            ExpressionType::Reference => Ok(ExpressionKind::Reference {
                template: self.template(name)?,
            }),
            ExpressionType::CodeableConcept => Ok(ExpressionKind::CodeableConcept {
                table: self.table.clone(),
            }),
            ExpressionType::Value => {
                if self.value_of.is_some() {
                    return Err(EvalError::malformed_expression(
                        name,
                        "'valueOf' must name a datatype/ or resource/ template",
                    ));
                }
                let data_type = match self.data_type.as_deref() {
                    Some(data_type) => data_type.parse::<DataType>()?,
                    None => DataType::String,
                };
                Ok(ExpressionKind::Value {
                    data_type,
                    table: self.table.clone(),
                })
            }
        }
    }

    fn inferred_type(&self) -> ExpressionType {
        if self.value.is_some() {
            return ExpressionType::Literal;
        }
        if self
            .value_of
            .as_deref()
            .is_some_and(|v| v.starts_with("datatype/") || v.starts_with("resource/"))
        {
            return ExpressionType::Resource;
        }
        if self
            .data_type
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(CODEABLE_CONCEPT_TYPE))
        {
            return ExpressionType::CodeableConcept;
        }
        ExpressionType::Value
    }

    fn template(&self, name: &str) -> EvalResult<String> {
        self.value_of
            .as_ref()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| EvalError::malformed_expression(name, "missing 'valueOf' template"))
    }
}

/// Resource or datatype template as written in YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplateDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub expressions: IndexMap<String, ExpressionDef>,
}

/// Compiled resource or datatype template
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTemplate {
    name: String,
    resource_type: Option<String>,
    expressions: IndexMap<String, Expression>,
}

impl ResourceTemplate {
    pub fn new(name: impl Into<String>, resource_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            resource_type,
            expressions: IndexMap::new(),
        }
    }

    /// Compile a template definition
    pub fn compile(name: &str, def: &ResourceTemplateDef) -> EvalResult<Self> {
        let mut template = Self::new(name, def.resource_type.clone());
        for (expr_name, expr_def) in &def.expressions {
            let expression = expr_def.compile(expr_name).map_err(|e| match e {
                EvalError::MalformedExpression { name: inner, message } => {
                    EvalError::malformed_expression(format!("{}.{}", name, inner), message)
                }
                other => other,
            })?;
            template.expressions.insert(expr_name.clone(), expression);
        }
        Ok(template)
    }

    /// Parse and compile YAML text
    pub fn from_yaml(name: &str, yaml: &str) -> EvalResult<Self> {
        let def: ResourceTemplateDef =
            serde_yaml::from_str(yaml).map_err(|e| EvalError::template_load(name, e))?;
        Self::compile(name, &def)
    }

    /// Add an expression, keeping declaration order
    pub fn with_expression(mut self, name: impl Into<String>, expression: Expression) -> Self {
        self.expressions.insert(name.into(), expression);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// FHIR resource type; `None` for datatype templates
    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    pub fn expressions(&self) -> &IndexMap<String, Expression> {
        &self.expressions
    }
}

/// One resource produced by a message template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResource {
    pub resource_name: String,
    /// Segment providing the base value
    pub segment: String,
    /// Resource template to evaluate
    pub resource_path: String,
    /// Produce one resource per segment occurrence
    #[serde(default)]
    pub repeats: bool,
}

/// Resources produced for one message type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    #[serde(skip)]
    pub name: String,
    pub resources: Vec<MessageResource>,
}

impl MessageTemplate {
    pub fn from_yaml(name: &str, yaml: &str) -> EvalResult<Self> {
        let mut template: MessageTemplate =
            serde_yaml::from_str(yaml).map_err(|e| EvalError::template_load(name, e))?;
        template.name = name.to_string();
        Ok(template)
    }
}

/// Registry of compiled templates, keyed by relative name without extension
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    resources: IndexMap<String, ResourceTemplate>,
    messages: IndexMap<String, MessageTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register YAML text; names under `message/` are message templates
    pub fn register_yaml(&mut self, name: &str, yaml: &str) -> EvalResult<()> {
        if name.starts_with(MESSAGE_TEMPLATE_PREFIX) {
            let template = MessageTemplate::from_yaml(name, yaml)?;
            self.messages.insert(name.to_string(), template);
        } else {
            let template = ResourceTemplate::from_yaml(name, yaml)?;
            self.resources.insert(name.to_string(), template);
        }
        log::debug!("Registered template '{}'", name);
        Ok(())
    }

    /// Register a compiled resource template under its name
    pub fn register(&mut self, template: ResourceTemplate) {
        self.resources.insert(template.name().to_string(), template);
    }

    pub fn register_message(&mut self, template: MessageTemplate) {
        self.messages.insert(template.name.clone(), template);
    }

    /// Load every `.yml`/`.yaml` file below a directory and validate the result
    pub fn load_dir(dir: impl AsRef<Path>) -> EvalResult<Self> {
        let mut registry = Self::new();
        registry.extend_from_dir(dir)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Add templates from a directory, replacing same-named ones
    pub fn extend_from_dir(&mut self, dir: impl AsRef<Path>) -> EvalResult<usize> {
        let dir = dir.as_ref();
        let mut count = 0;
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| EvalError::template_load(dir.display().to_string(), e))?;
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "yml" || e == "yaml");
            if !entry.file_type().is_file() || !is_yaml {
                continue;
            }

            let name = template_name(dir, path);
            let yaml = std::fs::read_to_string(path)
                .map_err(|e| EvalError::template_load(path.display().to_string(), e))?;
            self.register_yaml(&name, &yaml)?;
            count += 1;
        }
        log::info!("Loaded {} templates from {}", count, dir.display());
        Ok(count)
    }

    /// Check that every referenced template is registered
    pub fn validate(&self) -> EvalResult<()> {
        for template in self.resources.values() {
            for expression in template.expressions().values() {
                if let Some(target) = expression.template_name() {
                    if !self.resources.contains_key(target) {
                        return Err(EvalError::unknown_template(format!(
                            "{} (referenced from {})",
                            target,
                            template.name()
                        )));
                    }
                }
            }
        }
        for message in self.messages.values() {
            for resource in &message.resources {
                if !self.resources.contains_key(&resource.resource_path) {
                    return Err(EvalError::unknown_template(format!(
                        "{} (referenced from {})",
                        resource.resource_path, message.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ResourceTemplate> {
        self.resources.get(name)
    }

    pub fn message(&self, name: &str) -> Option<&MessageTemplate> {
        self.messages.get(name)
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn message_names(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.resources.len() + self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `dir/datatype/Identifier.yml` -> `datatype/Identifier`
fn template_name(dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(dir).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_inference() {
        let yaml = r#"
expressions:
  status:
    value: final
  identifier:
    valueOf: datatype/Identifier
    specs: PID.3
  code:
    type: CODEABLE_CONCEPT
    specs: OBX.3
    table: "0078"
  birthDate:
    type: DATE
    specs: PID.7
  subject:
    valueOf: resource/Patient
    expressionType: reference
    specs: PID
"#;
        let template = ResourceTemplate::from_yaml("resource/Test", yaml).unwrap();
        let kinds: Vec<_> = template.expressions().values().map(|e| e.kind.clone()).collect();
        assert_eq!(kinds[0], ExpressionKind::Literal(Value::string("final")));
        assert_eq!(
            kinds[1],
            ExpressionKind::Resource {
                template: "datatype/Identifier".to_string()
            }
        );
        assert_eq!(
            kinds[2],
            ExpressionKind::CodeableConcept {
                table: Some("0078".to_string())
            }
        );
        assert_eq!(
            kinds[3],
            ExpressionKind::Value {
                data_type: DataType::Date,
                table: None
            }
        );
        assert_eq!(
            kinds[4],
            ExpressionKind::Reference {
                template: "resource/Patient".to_string()
            }
        );
    }

    #[test]
    fn test_detailed_variables() {
        let yaml = r#"
expressions:
  name:
    specs: $names
    vars:
      names:
        specs: PID.5*
        extractMultiple: true
      first: PID.5.2
"#;
        let template = ResourceTemplate::from_yaml("datatype/Test", yaml).unwrap();
        let expression = &template.expressions()["name"];
        assert_eq!(expression.variables.len(), 2);
        assert!(expression.variables[0].is_multiple());
        assert!(!expression.variables[1].is_multiple());
    }

    #[test]
    fn test_value_and_value_of_conflict() {
        let yaml = r#"
expressions:
  broken:
    value: x
    valueOf: datatype/Identifier
"#;
        let err = ResourceTemplate::from_yaml("resource/Broken", yaml).unwrap_err();
        assert!(
            matches!(err, EvalError::MalformedExpression { ref name, .. } if name == "resource/Broken.broken")
        );
    }

    #[test]
    fn test_unknown_keys_fail_load() {
        let err = ResourceTemplate::from_yaml("x", "expressions:\n  a:\n    spec: PID.3\n").unwrap_err();
        assert!(matches!(err, EvalError::TemplateLoad { .. }));
    }

    #[test]
    fn test_validate_reports_missing_template() {
        let mut registry = TemplateRegistry::new();
        registry
            .register_yaml(
                "resource/Patient",
                "resourceType: Patient\nexpressions:\n  name:\n    valueOf: datatype/HumanName\n    specs: PID.5\n",
            )
            .unwrap();
        let err = registry.validate().unwrap_err();
        assert!(matches!(err, EvalError::UnknownTemplate { .. }));
    }
}
