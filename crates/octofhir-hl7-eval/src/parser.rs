//! Grammars for the template mini-languages, built with winnow
//!
//! Path specification:
//!
//! ```text
//! spec      := NAME ( "." INDEX ){0,3} ( ":" DATATYPE )? "*"?
//! NAME      := ALPHA ALNUM{1,2}
//! ```
//!
//! Condition:
//!
//! ```text
//! condition := and_expr ( "OR" and_expr )*
//! and_expr  := simple ( "AND" simple )*
//! simple    := "$" NAME ( "NULL" | "NOT_NULL" | ("EQUALS" | "NOT_EQUALS") literal )
//! literal   := '"' .. '"' | "'" .. "'" | bare token
//! ```

use crate::condition::Condition;
use winnow::ascii::{digit1, space0, space1};
use winnow::combinator::{alt, cut_err, delimited, eof, opt, preceded, repeat, terminated};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

/// Unvalidated parts of a path specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawSpec {
    pub name: String,
    pub indices: Vec<usize>,
    pub data_type: Option<String>,
    pub multiple: bool,
}

/// Parse a complete path specification
pub(crate) fn parse_spec(text: &str) -> Result<RawSpec, String> {
    terminated(spec, eof)
        .parse(text.trim())
        .map_err(|e| e.to_string())
}

/// Parse a complete condition
pub(crate) fn parse_condition(text: &str) -> Result<Condition, String> {
    terminated(condition, (space0, eof))
        .parse(text.trim())
        .map_err(|e| e.to_string())
}

fn spec(input: &mut &str) -> ModalResult<RawSpec> {
    let name = segment_name.parse_next(input)?;
    let indices: Vec<usize> = repeat(0..=3, preceded('.', index)).parse_next(input)?;
    let data_type = opt(preceded(
        ':',
        cut_err(take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_'))
            .context(StrContext::Expected(StrContextValue::Description("data type"))),
    ))
    .parse_next(input)?;
    let multiple = opt('*').parse_next(input)?.is_some();

    Ok(RawSpec {
        name: name.to_string(),
        indices,
        data_type: data_type.map(str::to_string),
        multiple,
    })
}

fn segment_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic()),
        take_while(1..=2, |c: char| c.is_ascii_alphanumeric()),
    )
        .take()
        .context(StrContext::Expected(StrContextValue::Description(
            "segment or data type name",
        )))
        .parse_next(input)
}

fn index(input: &mut &str) -> ModalResult<usize> {
    cut_err(digit1.try_map(str::parse::<usize>))
        .context(StrContext::Expected(StrContextValue::Description("index")))
        .parse_next(input)
}

fn condition(input: &mut &str) -> ModalResult<Condition> {
    let mut left = and_condition.parse_next(input)?;
    while opt(connective("OR")).parse_next(input)?.is_some() {
        let right = cut_err(and_condition).parse_next(input)?;
        left = Condition::Or(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn and_condition(input: &mut &str) -> ModalResult<Condition> {
    let mut left = simple_condition.parse_next(input)?;
    while opt(connective("AND")).parse_next(input)?.is_some() {
        let right = cut_err(simple_condition).parse_next(input)?;
        left = Condition::And(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn connective<'a>(keyword: &'static str) -> impl Parser<&'a str, (), ErrMode<ContextError>> {
    preceded(space1, word.verify(move |w: &str| w.eq_ignore_ascii_case(keyword))).void()
}

fn simple_condition(input: &mut &str) -> ModalResult<Condition> {
    space0.parse_next(input)?;
    let var = preceded('$', variable_name)
        .context(StrContext::Expected(StrContextValue::Description("$variable")))
        .parse_next(input)?
        .to_string();
    space1.parse_next(input)?;
    let op = word
        .context(StrContext::Expected(StrContextValue::Description("operator")))
        .parse_next(input)?;

    match op.to_ascii_uppercase().as_str() {
        "NULL" => Ok(Condition::CheckNull { var }),
        "NOT_NULL" => Ok(Condition::CheckNotNull { var }),
        "EQUALS" => {
            let literal = cut_err(preceded(space1, literal)).parse_next(input)?;
            Ok(Condition::Equals { var, literal })
        }
        "NOT_EQUALS" => {
            let literal = cut_err(preceded(space1, literal)).parse_next(input)?;
            Ok(Condition::NotEquals { var, literal })
        }
        _ => Err(ErrMode::Cut(ContextError::new())),
    }
}

fn variable_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-').parse_next(input)
}

fn word<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

fn literal(input: &mut &str) -> ModalResult<String> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
        take_till(1.., |c: char| c.is_whitespace()),
    ))
    .context(StrContext::Expected(StrContextValue::Description("literal")))
    .map(str::to_string)
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_parts() {
        let raw = parse_spec("PID.3.4.1:STRING*").unwrap();
        assert_eq!(raw.name, "PID");
        assert_eq!(raw.indices, vec![3, 4, 1]);
        assert_eq!(raw.data_type.as_deref(), Some("STRING"));
        assert!(raw.multiple);
    }

    #[test]
    fn test_spec_rejects_extra_index() {
        assert!(parse_spec("PID.3.4.1.2").is_err());
        assert!(parse_spec("PID.").is_err());
        assert!(parse_spec("P").is_err());
    }

    #[test]
    fn test_quoted_literal_keeps_spaces() {
        let cond = parse_condition("$status EQUALS 'in progress'").unwrap();
        assert_eq!(
            cond,
            Condition::Equals {
                var: "status".to_string(),
                literal: "in progress".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_operator() {
        assert!(parse_condition("$a LIKE x").is_err());
        assert!(parse_condition("$a EQUALS").is_err());
        assert!(parse_condition("$a NULL AND").is_err());
    }
}
