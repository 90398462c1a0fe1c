//! Wire-format parser

use crate::error::{ParseError, ParseResult};
use crate::message::Message;
use crate::model::{Delimiters, Field, Hl7Type, Segment};

/// Parse a raw HL7 v2 message
///
/// Segments may be terminated by `\r`, `\n` or `\r\n`; blank lines are ignored.
pub fn parse(input: &str) -> ParseResult<Message> {
    let mut lines = input
        .split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty());

    let header = lines.next().ok_or(ParseError::EmptyMessage)?;
    let (delimiters, msh) = parse_header(header)?;

    let mut segments = vec![msh];
    for (index, line) in lines.enumerate() {
        segments.push(parse_segment(line, &delimiters, index + 2)?);
    }

    log::debug!(
        "Parsed HL7 message with {} segments",
        segments.len()
    );
    Ok(Message::new(delimiters, segments))
}

fn parse_header(line: &str) -> ParseResult<(Delimiters, Segment)> {
    if !line.starts_with("MSH") {
        let found: String = line.chars().take(3).collect();
        return Err(ParseError::MissingHeader { found });
    }

    let field = line[3..]
        .chars()
        .next()
        .ok_or_else(|| ParseError::invalid_encoding("missing field separator"))?;
    if field.is_ascii_alphanumeric() {
        return Err(ParseError::invalid_encoding(format!(
            "'{}' cannot be used as field separator",
            field
        )));
    }

    let after = &line[3 + field.len_utf8()..];
    let (encoding, rest) = match after.find(field) {
        Some(i) => (&after[..i], Some(&after[i + field.len_utf8()..])),
        None => (after, None),
    };
    let delimiters = delimiters_from(field, encoding)?;

    let mut fields = vec![
        Field::new(vec![Hl7Type::primitive(field.to_string())]),
        Field::new(vec![Hl7Type::primitive(encoding)]),
    ];
    if let Some(rest) = rest {
        fields.extend(rest.split(field).map(|text| parse_field(text, &delimiters)));
    }

    Ok((delimiters, Segment::new("MSH", fields)))
}

fn delimiters_from(field: char, encoding: &str) -> ParseResult<Delimiters> {
    let chars: Vec<char> = encoding.chars().collect();
    if chars.len() < 2 || chars.len() > 5 {
        return Err(ParseError::invalid_encoding(format!(
            "expected 2 to 5 encoding characters, found '{}'",
            encoding
        )));
    }
    if chars.contains(&field) {
        return Err(ParseError::invalid_encoding(
            "encoding characters repeat the field separator",
        ));
    }

    let defaults = Delimiters::default();
    Ok(Delimiters {
        field,
        component: chars[0],
        repetition: chars[1],
        escape: chars.get(2).copied(),
        sub_component: chars.get(3).copied().unwrap_or(defaults.sub_component),
    })
}

fn parse_segment(line: &str, delimiters: &Delimiters, line_no: usize) -> ParseResult<Segment> {
    let mut parts = line.split(delimiters.field);
    let name = parts.next().unwrap_or_default();

    let valid = name.len() == 3
        && name.chars().all(|c| c.is_ascii_alphanumeric())
        && name.starts_with(|c: char| c.is_ascii_uppercase());
    if !valid {
        return Err(ParseError::invalid_segment(name, line_no));
    }

    let fields = parts.map(|text| parse_field(text, delimiters)).collect();
    Ok(Segment::new(name, fields))
}

fn parse_field(text: &str, delimiters: &Delimiters) -> Field {
    if text.is_empty() {
        return Field::default();
    }
    Field::new(
        text.split(delimiters.repetition)
            .map(|rep| parse_type(rep, delimiters))
            .collect(),
    )
}

fn parse_type(text: &str, delimiters: &Delimiters) -> Hl7Type {
    let components: Vec<&str> = text.split(delimiters.component).collect();
    if components.len() == 1 && !text.contains(delimiters.sub_component) {
        return Hl7Type::Primitive(unescape(text, delimiters));
    }
    Hl7Type::Composite(
        components
            .into_iter()
            .map(|c| parse_component(c, delimiters))
            .collect(),
    )
}

fn parse_component(text: &str, delimiters: &Delimiters) -> Hl7Type {
    if !text.contains(delimiters.sub_component) {
        return Hl7Type::Primitive(unescape(text, delimiters));
    }
    Hl7Type::Composite(
        text.split(delimiters.sub_component)
            .map(|s| Hl7Type::Primitive(unescape(s, delimiters)))
            .collect(),
    )
}

/// Resolve HL7 escape sequences (`\F\`, `\S\`, `\T\`, `\R\`, `\E\`, `\.br\`, `\Xhh\`)
///
/// Unknown or unterminated sequences are kept verbatim.
pub fn unescape(text: &str, delimiters: &Delimiters) -> String {
    let Some(esc) = delimiters.escape else {
        return text.to_string();
    };
    if !text.contains(esc) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(esc) {
        out.push_str(&rest[..start]);
        let after = &rest[start + esc.len_utf8()..];
        let Some(end) = after.find(esc) else {
            out.push_str(&rest[start..]);
            return out;
        };

        let sequence = &after[..end];
        match sequence {
            "F" => out.push(delimiters.field),
            "S" => out.push(delimiters.component),
            "T" => out.push(delimiters.sub_component),
            "R" => out.push(delimiters.repetition),
            "E" => out.push(esc),
            ".br" => out.push('\n'),
            hex if hex.starts_with('X') => match decode_hex(&hex[1..]) {
                Some(decoded) => out.push_str(&decoded),
                None => {
                    out.push(esc);
                    out.push_str(sequence);
                    out.push(esc);
                }
            },
            _ => {
                out.push(esc);
                out.push_str(sequence);
                out.push(esc);
            }
        }
        rest = &after[end + esc.len_utf8()..];
    }
    out.push_str(rest);
    out
}

/// Replace delimiter characters in `text` with escape sequences
///
/// Inverse of [`unescape`] for the separators and line breaks. Without an
/// escape character the text is returned as is.
pub fn escape(text: &str, delimiters: &Delimiters) -> String {
    let Some(esc) = delimiters.escape else {
        return text.to_string();
    };

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let sequence = match c {
            c if c == esc => "E",
            c if c == delimiters.field => "F",
            c if c == delimiters.component => "S",
            c if c == delimiters.sub_component => "T",
            c if c == delimiters.repetition => "R",
            '\n' => ".br",
            c => {
                out.push(c);
                continue;
            }
        };
        out.push(esc);
        out.push_str(sequence);
        out.push(esc);
    }
    out
}

fn decode_hex(digits: &str) -> Option<String> {
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}
