//! Conversion of raw message values to target data types
//!
//! Every conversion returns `None` when the candidate is blank or does not
//! parse; the caller then moves on to the next candidate.

use crate::terminology::TerminologyResolver;
use chrono::{FixedOffset, NaiveDate, NaiveTime};
use octofhir_hl7_types::{CodeableConcept, Coding, DataType, Hl7Type, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// HL7 DTM: `YYYY[MM[DD[HH[MM[SS[.S+]]]]]][+/-ZZZZ]`
static DTM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})(?:(\d{2})(?:(\d{2})(?:(\d{2})(?:(\d{2})(?:(\d{2})(?:\.(\d{1,4}))?)?)?)?)?)?([+-]\d{4})?$",
    )
    .unwrap()
});

/// Converts raw values to the data types named in templates
#[derive(Debug, Clone, Default)]
pub struct DataTypeConverter {
    terminology: TerminologyResolver,
    default_offset: Option<FixedOffset>,
}

impl DataTypeConverter {
    pub fn new(terminology: TerminologyResolver) -> Self {
        Self {
            terminology,
            default_offset: None,
        }
    }

    /// Offset applied to date-times sent without one
    pub fn with_default_offset(mut self, offset: Option<FixedOffset>) -> Self {
        self.default_offset = offset;
        self
    }

    pub fn terminology(&self) -> &TerminologyResolver {
        &self.terminology
    }

    /// Convert a value; `table` is used by code-bearing types
    pub fn convert(&self, value: &Value, data_type: DataType, table: Option<&str>) -> Option<Value> {
        if value.is_empty() {
            return None;
        }
        match data_type {
            DataType::String | DataType::Uri | DataType::Code => text(value).map(Value::String),
            DataType::Integer => {
                let number = Decimal::from_str(&text(value)?).ok()?;
                number.fract().is_zero().then_some(Value::Number(number.trunc()))
            }
            DataType::Decimal => Decimal::from_str(&text(value)?).ok().map(Value::Number),
            DataType::Boolean => parse_boolean(&text(value)?).map(Value::Boolean),
            DataType::Date => parse_dtm(&text(value)?).map(|dtm| Value::String(dtm.date_string())),
            DataType::DateTime => parse_dtm(&text(value)?)
                .map(|dtm| Value::String(dtm.date_time_string(self.default_offset))),
            DataType::Instant => parse_dtm(&text(value)?)
                .and_then(|dtm| dtm.instant_string(self.default_offset))
                .map(Value::String),
            DataType::SystemUrl => self.terminology.system_url(&text(value)?).map(Value::String),
            DataType::Coding => self.coding(value, table).map(Coding::into_value),
            DataType::Object => Some(value.clone()),
        }
    }

    /// Build a coding from `code^display^system` or a bare code
    pub fn coding(&self, value: &Value, table: Option<&str>) -> Option<Coding> {
        match value {
            Value::Type(hl7 @ Hl7Type::Composite(_)) => {
                let code = hl7.component(1).and_then(Hl7Type::text)?;
                let mut coding = self.terminology.coding(code.trim(), table);
                if let Some(display) = hl7.component(2).and_then(Hl7Type::text) {
                    coding.display = Some(display.to_string());
                }
                if let Some(system) = hl7
                    .component(3)
                    .and_then(Hl7Type::text)
                    .and_then(|name| self.terminology.system_url(name))
                {
                    coding.system = Some(system);
                }
                Some(coding)
            }
            Value::Object(_) => {
                let code = value.get("code").and_then(Value::to_text)?;
                let mut coding = Coding::new(code);
                coding.system = value.get("system").and_then(Value::to_text);
                coding.display = value.get("display").and_then(Value::to_text);
                Some(coding)
            }
            _ => text(value).map(|code| self.terminology.coding(&code, table)),
        }
    }

    /// Build a CodeableConcept; `text` is the original text or the raw code
    pub fn codeable_concept(&self, value: &Value, table: Option<&str>) -> Option<Value> {
        if value.is_empty() {
            return None;
        }
        let coding = self.coding(value, table)?;
        let text = match value {
            Value::Type(hl7) => hl7
                .component(2)
                .filter(|_| matches!(hl7, Hl7Type::Composite(_)))
                .and_then(Hl7Type::text)
                .map(str::to_string),
            _ => None,
        }
        .unwrap_or_else(|| coding.code.clone());
        Some(CodeableConcept::from_coding(coding).with_text(text).into_value())
    }
}

fn text(value: &Value) -> Option<String> {
    value
        .to_text()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_boolean(text: &str) -> Option<bool> {
    match text.to_ascii_uppercase().as_str() {
        "Y" | "YES" | "T" | "TRUE" | "1" => Some(true),
        "N" | "NO" | "F" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

/// Parsed HL7 date/time with its precision
#[derive(Debug, Clone, PartialEq)]
struct Dtm {
    date: NaiveDate,
    /// Number of date parts given: 1 = year, 2 = month, 3 = day
    date_parts: u8,
    time: Option<NaiveTime>,
    has_seconds: bool,
    fraction: Option<String>,
    offset: Option<FixedOffset>,
}

fn parse_dtm(text: &str) -> Option<Dtm> {
    let caps = DTM_PATTERN.captures(text)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let month = num(2);
    let day = num(3);
    let date = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))?;
    let date_parts = 1 + u8::from(month.is_some()) + u8::from(day.is_some());

    let time = match num(4) {
        Some(hour) => Some(NaiveTime::from_hms_opt(hour, num(5).unwrap_or(0), num(6).unwrap_or(0))?),
        None => None,
    };

    let offset = match caps.get(8) {
        Some(m) => Some(parse_offset(m.as_str())?),
        None => None,
    };

    Some(Dtm {
        date,
        date_parts,
        time,
        has_seconds: caps.get(6).is_some(),
        fraction: caps.get(7).map(|m| m.as_str().to_string()),
        offset,
    })
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (sign, digits) = text.split_at(1);
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..4)?.parse().ok()?;
    let seconds = (hours * 3600 + minutes * 60) * if sign == "-" { -1 } else { 1 };
    FixedOffset::east_opt(seconds)
}

impl Dtm {
    fn date_string(&self) -> String {
        match self.date_parts {
            1 => self.date.format("%Y").to_string(),
            2 => self.date.format("%Y-%m").to_string(),
            _ => self.date.format("%Y-%m-%d").to_string(),
        }
    }

    fn time_string(&self, time: NaiveTime) -> String {
        let mut out = time.format("%H:%M:%S").to_string();
        if let Some(fraction) = &self.fraction {
            out.push('.');
            out.push_str(fraction);
        }
        out
    }

    /// Partial dates stay partial; a time gets the value or default offset
    fn date_time_string(&self, default_offset: Option<FixedOffset>) -> String {
        let Some(time) = self.time.filter(|_| self.date_parts == 3) else {
            return self.date_string();
        };
        let mut out = format!("{}T{}", self.date_string(), self.time_string(time));
        if let Some(offset) = self.offset.or(default_offset) {
            out.push_str(&offset.to_string());
        }
        out
    }

    /// Instants need full precision down to the second
    fn instant_string(&self, default_offset: Option<FixedOffset>) -> Option<String> {
        let time = self.time.filter(|_| self.has_seconds && self.date_parts == 3)?;
        let offset = self
            .offset
            .or(default_offset)
            .or_else(|| FixedOffset::east_opt(0))?;
        Some(format!("{}T{}{}", self.date_string(), self.time_string(time), offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_hl7_message::Hl7Type;
    use rstest::rstest;

    fn raw(text: &str) -> Value {
        Value::Type(Hl7Type::primitive(text))
    }

    #[rstest]
    #[case("2009", "2009")]
    #[case("200910", "2009-10")]
    #[case("20091020", "2009-10-20")]
    #[case("20091020153000", "2009-10-20")]
    fn test_date_precision(#[case] input: &str, #[case] expected: &str) {
        let converter = DataTypeConverter::default();
        assert_eq!(
            converter.convert(&raw(input), DataType::Date, None),
            Some(Value::string(expected))
        );
    }

    #[rstest]
    #[case("20091020", None, "2009-10-20")]
    #[case("200910201530", None, "2009-10-20T15:30:00")]
    #[case("20091020153045.12-0500", None, "2009-10-20T15:30:45.12-05:00")]
    #[case("200910201530", Some(3600), "2009-10-20T15:30:00+01:00")]
    fn test_date_time(#[case] input: &str, #[case] offset: Option<i32>, #[case] expected: &str) {
        let converter = DataTypeConverter::default()
            .with_default_offset(offset.and_then(FixedOffset::east_opt));
        assert_eq!(
            converter.convert(&raw(input), DataType::DateTime, None),
            Some(Value::string(expected))
        );
    }

    #[test]
    fn test_instant_requires_seconds() {
        let converter = DataTypeConverter::default();
        assert_eq!(converter.convert(&raw("200910201530"), DataType::Instant, None), None);
        assert_eq!(
            converter.convert(&raw("20091020153045"), DataType::Instant, None),
            Some(Value::string("2009-10-20T15:30:45+00:00"))
        );
    }

    #[rstest]
    #[case("20091320")]
    #[case("2009102")]
    #[case("20091020256000")]
    #[case("yesterday")]
    fn test_invalid_dates_are_skipped(#[case] input: &str) {
        let converter = DataTypeConverter::default();
        assert_eq!(converter.convert(&raw(input), DataType::DateTime, None), None);
    }

    #[test]
    fn test_numbers_and_booleans() {
        let converter = DataTypeConverter::default();
        assert_eq!(
            converter.convert(&raw("42"), DataType::Integer, None),
            Some(Value::Number(Decimal::from(42)))
        );
        assert_eq!(converter.convert(&raw("4.2"), DataType::Integer, None), None);
        assert_eq!(
            converter.convert(&raw("Y"), DataType::Boolean, None),
            Some(Value::Boolean(true))
        );
        assert_eq!(converter.convert(&raw("maybe"), DataType::Boolean, None), None);
    }

    #[test]
    fn test_string_of_composite_is_first_component() {
        let value = Value::Type(Hl7Type::Composite(vec![
            Hl7Type::primitive("000010016"),
            Hl7Type::primitive(""),
            Hl7Type::primitive("MR"),
        ]));
        let converter = DataTypeConverter::default();
        assert_eq!(
            converter.convert(&value, DataType::String, None),
            Some(Value::string("000010016"))
        );
    }

    #[test]
    fn test_blank_value_is_skipped() {
        let converter = DataTypeConverter::default();
        assert_eq!(converter.convert(&raw("  "), DataType::Object, None), None);
    }
}
