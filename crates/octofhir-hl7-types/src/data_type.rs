//! Conversion targets for value expressions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Target data type of a value expression or a typed specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Instant,
    Uri,
    /// Coding system name (e.g. `SCT`) resolved to its system URL
    SystemUrl,
    Code,
    Coding,
    /// Raw value, passed through without conversion
    Object,
}

/// Error for an unrecognised data type identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown data type: {0}")]
pub struct UnknownDataTypeError(pub String);

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Integer => "INTEGER",
            Self::Decimal => "DECIMAL",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::DateTime => "DATE_TIME",
            Self::Instant => "INSTANT",
            Self::Uri => "URI",
            Self::SystemUrl => "SYSTEM_URL",
            Self::Code => "CODE",
            Self::Coding => "CODING",
            Self::Object => "OBJECT",
        }
    }
}

impl FromStr for DataType {
    type Err = UnknownDataTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STRING" => Ok(Self::String),
            "INTEGER" => Ok(Self::Integer),
            "DECIMAL" | "NUMBER" => Ok(Self::Decimal),
            "BOOLEAN" => Ok(Self::Boolean),
            "DATE" => Ok(Self::Date),
            "DATE_TIME" | "DATETIME" => Ok(Self::DateTime),
            "INSTANT" => Ok(Self::Instant),
            "URI" => Ok(Self::Uri),
            "SYSTEM_URL" => Ok(Self::SystemUrl),
            "CODE" => Ok(Self::Code),
            "CODING" => Ok(Self::Coding),
            "OBJECT" => Ok(Self::Object),
            _ => Err(UnknownDataTypeError(s.to_string())),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("STRING", DataType::String)]
    #[case("date_time", DataType::DateTime)]
    #[case("DateTime", DataType::DateTime)]
    #[case("number", DataType::Decimal)]
    #[case(" system_url ", DataType::SystemUrl)]
    #[case("OBJECT", DataType::Object)]
    fn test_parse_is_case_insensitive(#[case] input: &str, #[case] expected: DataType) {
        assert_eq!(input.parse::<DataType>(), Ok(expected));
    }

    #[rstest]
    #[case("CODEABLE")]
    #[case("")]
    #[case("DATE TIME")]
    fn test_parse_unknown(#[case] input: &str) {
        assert_eq!(
            input.parse::<DataType>(),
            Err(UnknownDataTypeError(input.to_string()))
        );
    }

    #[test]
    fn test_display_parses_back() {
        assert_eq!(DataType::DateTime.to_string(), "DATE_TIME");
        assert_eq!("DATE_TIME".parse::<DataType>(), Ok(DataType::DateTime));
    }
}
