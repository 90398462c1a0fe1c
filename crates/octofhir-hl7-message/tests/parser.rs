//! Tests for splitting HL7 v2 messages into segments, fields and types

use octofhir_hl7_message::{Hl7Type, ParseError, parse};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

const ADT_A01: &str = "MSH|^~\\&|hl7Integration|hl7Integration|||||ADT^A01|||2.3|\r\
EVN|A01|20130617154644\r\
PID|1|465 306 5961|000010016^^^SY1^MR~000010017^^^SY2^SS~000010018^^^MR|407623|Wood^Patrick^^^MR||19700101|female|||High Street^^Oxford^^Ox1 4DP~George St^^Oxford^^Ox1 5AP|||||||\r\
NK1|1|Wood^John^^^MR|Father||999-9999\r\
NK1|2|Jones^Georgie^^^MSS|MOTHER||999-9999\r";

#[test]
fn test_header_fields() {
    let message = parse(ADT_A01).unwrap();
    let msh = message.header().unwrap();

    assert_eq!(msh.repetitions(1)[0], Hl7Type::primitive("|"));
    assert_eq!(msh.repetitions(2)[0], Hl7Type::primitive("^~\\&"));
    assert_eq!(msh.repetitions(3)[0].text(), Some("hl7Integration"));
    assert_eq!(message.message_type().as_deref(), Some("ADT^A01"));
    assert_eq!(message.version(), Some("2.3"));
    assert_eq!(message.control_id(), None);
}

#[test]
fn test_repeating_field() {
    let message = parse(ADT_A01).unwrap();
    let pid = message.segment("PID", 0).unwrap();
    let reps = pid.repetitions(3);

    assert_eq!(reps.len(), 3);
    assert_eq!(reps[0].text(), Some("000010016"));
    assert_eq!(reps[1].component(4).and_then(Hl7Type::text), Some("SY2"));
    assert_eq!(reps[2].component(4).and_then(Hl7Type::text), Some("MR"));
    assert!(reps[2].component(5).is_none());
}

#[test]
fn test_segment_occurrences() {
    let message = parse(ADT_A01).unwrap();
    assert_eq!(message.segments_named("NK1").count(), 2);

    let second = message.segment("NK1", 1).unwrap();
    assert_eq!(second.repetitions(3)[0].text(), Some("MOTHER"));
    assert!(message.segment("NK1", 2).is_none());
}

#[test]
fn test_empty_field_has_no_repetitions() {
    let message = parse(ADT_A01).unwrap();
    let pid = message.segment("PID", 0).unwrap();
    assert!(pid.repetitions(6).is_empty());
    assert!(pid.repetitions(99).is_empty());
}

#[test]
fn test_sub_components() {
    let message = parse("MSH|^~\\&|A\nPID|1||123^^^HOSP&1.2.3&ISO").unwrap();
    let pid = message.segment("PID", 0).unwrap();
    let authority = pid.repetitions(3)[0].component(4).unwrap();

    assert_eq!(authority.component(1).and_then(Hl7Type::text), Some("HOSP"));
    assert_eq!(authority.component(3).and_then(Hl7Type::text), Some("ISO"));
}

#[test]
fn test_escaped_separator_is_not_split() {
    let message = parse("MSH|^~\\&|A\rOBX|1|TX|||a\\S\\b").unwrap();
    let obx = message.segment("OBX", 0).unwrap();
    assert_eq!(obx.repetitions(5)[0], Hl7Type::primitive("a^b"));
}

#[test]
fn test_custom_delimiters() {
    let message = parse("MSH#*!\\%#APP\rPID#1##id1*x*y*SYS!id2").unwrap();
    let pid = message.segment("PID", 0).unwrap();
    let reps = pid.repetitions(3);

    assert_eq!(reps.len(), 2);
    assert_eq!(reps[0].component(4).and_then(Hl7Type::text), Some("SYS"));
    assert_eq!(reps[1].text(), Some("id2"));
}

#[rstest]
#[case("", ParseError::EmptyMessage)]
#[case("\r\n\r\n", ParseError::EmptyMessage)]
#[case("PID|1", ParseError::MissingHeader { found: "PID".to_string() })]
#[case("MSH|^|A", ParseError::invalid_encoding("expected 2 to 5 encoding characters, found '^'"))]
#[case("MSH|^~\\&|A\rpid|1", ParseError::invalid_segment("pid", 2))]
#[case("MSH|^~\\&|A\rPI|1", ParseError::invalid_segment("PI", 2))]
fn test_parse_errors(#[case] input: &str, #[case] expected: ParseError) {
    assert_eq!(parse(input).unwrap_err(), expected);
}

proptest! {
    #[test]
    fn parse_never_panics(body in "[A-Z0-9|^~&\\\\ \r]{0,80}") {
        let _ = parse(&format!("MSH|^~\\&|{}", body));
    }
}

#[test]
fn test_encode_with_declared_delimiters() {
    let message = parse("MSH#*!@%#APP#FAC\rPID#1##123*X@S@Y!456%7").unwrap();
    let pid = message.segment("PID", 0).unwrap();

    assert_eq!(pid.repetitions(3)[0].component(2).and_then(Hl7Type::text), Some("X*Y"));
    assert_eq!(pid.encode(message.delimiters()), "PID#1##123*X@S@Y!456%7");
    assert_eq!(pid.to_string(), "PID|1||123^X\\S\\Y~456&7");
    assert_eq!(
        message.header().unwrap().encode(message.delimiters()),
        "MSH#*!@%#APP#FAC"
    );
}
