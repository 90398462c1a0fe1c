//! Convert command implementation

use super::output;
use crate::Hl7ToFhirConverter;
use anyhow::{Context, Result, anyhow, bail};
use chrono::FixedOffset;
use std::fs;
use std::path::PathBuf;

/// Configuration for convert command
pub struct ConvertConfig {
    pub file: PathBuf,
    pub templates: Vec<PathBuf>,
    pub terminology: Vec<PathBuf>,
    pub default_offset: Option<String>,
    pub compact: bool,
    pub output_file: Option<PathBuf>,
}

/// Convert an HL7 v2 message file into a FHIR bundle
pub fn convert(config: ConvertConfig) -> Result<()> {
    let text = fs::read_to_string(&config.file)
        .with_context(|| format!("Failed to read message file: {}", config.file.display()))?;
    log::debug!("Loaded {} bytes from {}", text.len(), config.file.display());

    let mut builder = Hl7ToFhirConverter::builder();
    for dir in &config.templates {
        builder = builder.with_templates(dir);
    }
    for path in &config.terminology {
        builder = builder.with_terminology(path);
    }
    if let Some(offset) = &config.default_offset {
        builder = builder.with_default_offset(parse_offset(offset)?);
    }
    let converter = builder.build().context("Failed to load templates")?;

    let bundle = converter
        .convert(&text)
        .with_context(|| format!("Failed to convert {}", config.file.display()))?;
    let entries = bundle["entry"].as_array().map_or(0, Vec::len);
    if entries == 0 {
        eprintln!(
            "{}",
            output::format_warning("The message produced no resources")
        );
    }
    log::info!("Converted {} into {} resources", config.file.display(), entries);

    let content = output::format_json(&bundle, !config.compact)?;
    output::write_output(&content, config.output_file.as_deref())
}

/// Parse a UTC offset: `Z`, `+HH:MM` or `+HHMM`
pub fn parse_offset(text: &str) -> Result<FixedOffset> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("Invalid offset: {}", text));
    }

    let (sign, rest) = match text.chars().next() {
        Some('+') => (1, &text[1..]),
        Some('-') => (-1, &text[1..]),
        _ => bail!("Offset must start with '+' or '-': {}", text),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        bail!("Offset must look like +HH:MM: {}", text);
    }
    let hours: i32 = digits[..2].parse()?;
    let minutes: i32 = digits[2..].parse()?;
    if minutes >= 60 {
        bail!("Invalid offset minutes: {}", text);
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("Offset out of range: {}", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Z", 0)]
    #[case("+00:00", 0)]
    #[case("+05:30", 19800)]
    #[case("-0400", -14400)]
    fn test_parse_offset(#[case] text: &str, #[case] seconds: i32) {
        assert_eq!(parse_offset(text).unwrap().local_minus_utc(), seconds);
    }

    #[rstest]
    #[case("05:00")]
    #[case("+5")]
    #[case("+05:75")]
    #[case("+99:00")]
    fn test_parse_offset_rejects(#[case] text: &str) {
        assert!(parse_offset(text).is_err());
    }
}
