//! Compiled mapping expressions

use crate::condition::Condition;
use crate::error::EvalResult;
use crate::specification::SpecSource;
use crate::variable::Variable;
use octofhir_hl7_types::{DataType, Value};

/// What an expression produces from each candidate
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// Candidate converted to a data type
    Value {
        data_type: DataType,
        table: Option<String>,
    },
    /// Nested template evaluated with the candidate as base
    Resource { template: String },
    /// Nested resource template, emitted separately and referenced by id
    Reference { template: String },
    /// Coding plus text built through the terminology resolver
    CodeableConcept { table: Option<String> },
    /// Constant value
    Literal(Value),
}

/// One node of a template
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    /// Ordered fallback sources; empty means "use the base value"
    pub specs: Vec<SpecSource>,
    pub condition: Option<Condition>,
    /// Declared variables, resolved in order
    pub variables: Vec<Variable>,
    /// Parent composite is dropped when this expression is absent
    pub required: bool,
    /// Collect every candidate instead of the first
    pub generate_list: bool,
}

impl Expression {
    pub fn new(kind: ExpressionKind) -> Self {
        Self {
            kind,
            specs: Vec::new(),
            condition: None,
            variables: Vec::new(),
            required: false,
            generate_list: false,
        }
    }

    /// Value expression converting to `data_type`
    pub fn value(data_type: DataType) -> Self {
        Self::new(ExpressionKind::Value {
            data_type,
            table: None,
        })
    }

    pub fn resource(template: impl Into<String>) -> Self {
        Self::new(ExpressionKind::Resource {
            template: template.into(),
        })
    }

    pub fn reference(template: impl Into<String>) -> Self {
        Self::new(ExpressionKind::Reference {
            template: template.into(),
        })
    }

    pub fn codeable_concept(table: Option<&str>) -> Self {
        Self::new(ExpressionKind::CodeableConcept {
            table: table.map(str::to_string),
        })
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new(ExpressionKind::Literal(value.into()))
    }

    /// Set the `|`-separated sources
    pub fn with_specs(mut self, specs: &str) -> EvalResult<Self> {
        self.specs = SpecSource::parse_list(specs, false, false)?;
        Ok(self)
    }

    pub fn with_condition(mut self, condition: &str) -> EvalResult<Self> {
        self.condition = Some(Condition::parse(condition)?);
        Ok(self)
    }

    pub fn with_variable(mut self, name: &str, specs: &str) -> EvalResult<Self> {
        self.variables.push(Variable::parse(name, specs, false)?);
        Ok(self)
    }

    /// Code table for value and codeable concept expressions
    pub fn with_table(mut self, table: &str) -> Self {
        match &mut self.kind {
            ExpressionKind::Value { table: t, .. } | ExpressionKind::CodeableConcept { table: t } => {
                *t = Some(table.to_string());
            }
            _ => {}
        }
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn generate_list(mut self) -> Self {
        self.generate_list = true;
        self
    }

    /// Template this expression evaluates, if any
    pub fn template_name(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Resource { template } | ExpressionKind::Reference { template } => {
                Some(template)
            }
            _ => None,
        }
    }
}
