//! Guard conditions on expressions

use crate::context::{EvaluationContext, normalize_name};
use crate::error::{EvalError, EvalResult};
use crate::parser::parse_condition;
use std::fmt;
use std::str::FromStr;

/// Boolean predicate over context variables
///
/// Testing never fails: a variable missing from the context behaves like an
/// empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Variable is missing or empty
    CheckNull { var: String },
    /// Variable holds a non-empty result
    CheckNotNull { var: String },
    /// Stringified value equals the literal
    Equals { var: String, literal: String },
    /// Variable is missing or its stringified value differs from the literal
    NotEquals { var: String, literal: String },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Parse condition text such as `$code EQUALS "AB" OR $other NULL`
    pub fn parse(text: &str) -> EvalResult<Self> {
        if text.trim().is_empty() {
            return Err(EvalError::malformed_condition(text, "empty condition"));
        }
        let condition = parse_condition(text).map_err(|e| EvalError::malformed_condition(text, e))?;
        Ok(condition.normalized())
    }

    /// Evaluate against the context
    pub fn test(&self, ctx: &EvaluationContext) -> bool {
        match self {
            Self::CheckNull { var } => is_null(ctx, var),
            Self::CheckNotNull { var } => !is_null(ctx, var),
            Self::Equals { var, literal } => text_of(ctx, var).is_some_and(|text| text == *literal),
            Self::NotEquals { var, literal } => text_of(ctx, var).is_none_or(|text| text != *literal),
            Self::And(left, right) => left.test(ctx) && right.test(ctx),
            Self::Or(left, right) => left.test(ctx) || right.test(ctx),
        }
    }

    /// Names of every variable the condition reads, in order of appearance
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::CheckNull { var }
            | Self::CheckNotNull { var }
            | Self::Equals { var, .. }
            | Self::NotEquals { var, .. } => {
                if !names.contains(&var.as_str()) {
                    names.push(var);
                }
            }
            Self::And(left, right) | Self::Or(left, right) => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
        }
    }

    fn normalized(self) -> Self {
        let norm = |var: String| normalize_name(&var).to_string();
        match self {
            Self::CheckNull { var } => Self::CheckNull { var: norm(var) },
            Self::CheckNotNull { var } => Self::CheckNotNull { var: norm(var) },
            Self::Equals { var, literal } => Self::Equals {
                var: norm(var),
                literal,
            },
            Self::NotEquals { var, literal } => Self::NotEquals {
                var: norm(var),
                literal,
            },
            Self::And(left, right) => {
                Self::And(Box::new(left.normalized()), Box::new(right.normalized()))
            }
            Self::Or(left, right) => Self::Or(Box::new(left.normalized()), Box::new(right.normalized())),
        }
    }
}

fn is_null(ctx: &EvaluationContext, var: &str) -> bool {
    ctx.get_local(var).is_none_or(|result| result.is_empty())
}

fn text_of(ctx: &EvaluationContext, var: &str) -> Option<String> {
    ctx.get_local(var)
        .filter(|result| !result.is_empty())
        .and_then(|result| result.first())
        .and_then(|value| value.to_text())
}

impl FromStr for Condition {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckNull { var } => write!(f, "${} NULL", var),
            Self::CheckNotNull { var } => write!(f, "${} NOT_NULL", var),
            Self::Equals { var, literal } => write!(f, "${} EQUALS '{}'", var, literal),
            Self::NotEquals { var, literal } => write!(f, "${} NOT_EQUALS '{}'", var, literal),
            Self::And(left, right) => write!(f, "{} AND {}", left, right),
            Self::Or(left, right) => write!(f, "{} OR {}", left, right),
        }
    }
}
