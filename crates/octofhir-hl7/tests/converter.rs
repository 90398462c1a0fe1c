//! Converter Tests
//!
//! Whole-message conversion with the built-in templates, template and code
//! table overrides, and conversion settings.

use chrono::FixedOffset;
use octofhir_hl7::{ConversionError, Hl7ToFhirConverter};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

const ADT_A01: &[&str] = &[
    "MSH|^~\\&|SE050|050|PACS|050|20120912011230||ADT^A01^ADT_A01|102|T|2.6",
    "EVN||201209122222",
    "PID|1||1234^^^^MR~5678^^^^SS||DOE^JOHN^A^^DR||20000101|M|||123 MAIN ST^^SAN DIEGO^CA^92101^USA||(555)555-1234^PRN^PH~^NET^Internet^john@example.com|||M",
    "PV1|1|I|||||||||||||||||1400|||||||||||||||||||||||||20120912011230|20120915103000",
];

const ORU_R01: &[&str] = &[
    "MSH|^~\\&|LAB|FAC|EHR|FAC|20200102090000||ORU^R01|2|P|2.5",
    "PID|1||1234^^^^MR||DOE^JANE||19800101|F",
    "OBR|1|||GLU^Glucose|||20200102080000",
    "OBX|1|NM|2345-7^Glucose^LN||182|mg/dL|70-105|H|||F|||20200102083000-0500",
    "OBX|2|TX|8251-1^Service comment^LN||Fasting specimen||||||F",
];

fn text(segments: &[&str]) -> String {
    segments.join("\r")
}

fn convert(segments: &[&str]) -> Value {
    Hl7ToFhirConverter::new()
        .unwrap()
        .convert(&text(segments))
        .unwrap()
}

fn resources(bundle: &Value) -> Vec<Value> {
    bundle["entry"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["resource"].clone())
        .collect()
}

fn v2(table: &str, code: &str, display: &str) -> Value {
    json!({
        "coding": [{
            "system": format!("http://terminology.hl7.org/CodeSystem/v2-{}", table),
            "code": code,
            "display": display
        }],
        "text": code
    })
}

// ============================================================================
// ADT^A01
// ============================================================================

#[test]
fn test_adt_bundle_shape() {
    let bundle = convert(ADT_A01);
    assert_eq!(bundle["resourceType"], "Bundle");
    assert_eq!(bundle["type"], "collection");

    let types: Vec<_> = resources(&bundle)
        .iter()
        .map(|r| r["resourceType"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(types, vec!["Patient", "Encounter"]);
}

#[test]
fn test_adt_patient() {
    let bundle = convert(ADT_A01);
    assert_eq!(
        resources(&bundle)[0],
        json!({
            "resourceType": "Patient",
            "id": "1",
            "identifier": [
                {"type": v2("0203", "MR", "Medical record number"), "value": "1234"},
                {"type": v2("0203", "SS", "Social Security number"), "value": "5678"}
            ],
            "name": [{"family": "DOE", "given": ["JOHN"], "prefix": ["DR"]}],
            "gender": "M",
            "birthDate": "2000-01-01",
            "address": [{
                "line": ["123 MAIN ST"],
                "city": "SAN DIEGO",
                "state": "CA",
                "postalCode": "92101",
                "country": "USA"
            }],
            "telecom": [
                {"system": "phone", "value": "(555)555-1234"},
                {"value": "john@example.com"}
            ],
            "maritalStatus": v2("0002", "M", "Married")
        })
    );
}

#[test]
fn test_adt_encounter_references_patient() {
    let bundle = convert(ADT_A01);
    assert_eq!(
        resources(&bundle)[1],
        json!({
            "resourceType": "Encounter",
            "id": "2",
            "identifier": [{"value": "1400"}],
            "status": "finished",
            "class": {
                "system": "http://terminology.hl7.org/CodeSystem/v2-0004",
                "code": "I",
                "display": "Inpatient"
            },
            "subject": {"reference": "Patient/1"},
            "period": {
                "start": "2012-09-12T01:12:30",
                "end": "2012-09-15T10:30:00"
            }
        })
    );
}

#[test]
fn test_encounter_without_discharge_has_no_status() {
    let mut segments = ADT_A01.to_vec();
    segments[3] = "PV1|1|O";
    let bundle = convert(&segments);
    let encounter = &resources(&bundle)[1];
    assert_eq!(encounter.get("status"), None);
    assert_eq!(encounter.get("period"), None);
    assert_eq!(encounter["subject"], json!({"reference": "Patient/1"}));
}

// ============================================================================
// ORU^R01
// ============================================================================

#[test]
fn test_oru_one_observation_per_obx() {
    let bundle = convert(ORU_R01);
    let resources = resources(&bundle);
    assert_eq!(resources.len(), 3);

    assert_eq!(
        resources[1],
        json!({
            "resourceType": "Observation",
            "id": "2",
            "status": "final",
            "code": {
                "coding": [{"system": "http://loinc.org", "code": "2345-7", "display": "Glucose"}],
                "text": "Glucose"
            },
            "subject": {"reference": "Patient/1"},
            "effectiveDateTime": "2020-01-02T08:30:00-05:00",
            "valueQuantity": {
                "value": 182,
                "unit": "mg/dL",
                "system": "http://unitsofmeasure.org",
                "code": "mg/dL"
            },
            "interpretation": [v2("0078", "H", "High")]
        })
    );
}

#[test]
fn test_oru_text_observation_falls_back_to_order_time() {
    let bundle = convert(ORU_R01);
    let observation = &resources(&bundle)[2];
    assert_eq!(observation["id"], "3");
    assert_eq!(observation["valueString"], "Fasting specimen");
    assert_eq!(observation["effectiveDateTime"], "2020-01-02T08:00:00");
    assert_eq!(observation.get("valueQuantity"), None);
    assert_eq!(observation.get("interpretation"), None);
}

#[test]
fn test_observation_without_code_is_dropped() {
    let mut segments = ORU_R01.to_vec();
    segments[4] = "OBX|2|TX|||Fasting specimen";
    let bundle = convert(&segments);
    assert_eq!(resources(&bundle).len(), 2);
}

#[test]
fn test_observation_without_patient_creates_none() {
    let segments = [ORU_R01[0], ORU_R01[3]];
    let bundle = convert(&segments);
    let resources = resources(&bundle);
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0]["resourceType"], "Observation");
    assert_eq!(resources[0].get("subject"), None);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_default_offset_applies_to_local_times() {
    let converter = Hl7ToFhirConverter::builder()
        .with_default_offset(FixedOffset::east_opt(2 * 3600).unwrap())
        .build()
        .unwrap();
    let bundle = converter.convert(&text(ADT_A01)).unwrap();
    assert_eq!(
        resources(&bundle)[1]["period"]["start"],
        "2012-09-12T01:12:30+02:00"
    );
}

#[test]
fn test_custom_templates_replace_builtins() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("resource")).unwrap();
    fs::write(
        dir.path().join("resource/Patient.yml"),
        "resourceType: Patient\nexpressions:\n  gender:\n    type: CODE\n    specs: PID.8\n",
    )
    .unwrap();

    let converter = Hl7ToFhirConverter::builder()
        .with_templates(dir.path())
        .build()
        .unwrap();
    let bundle = converter.convert(&text(ADT_A01)).unwrap();
    assert_eq!(
        resources(&bundle)[0],
        json!({"resourceType": "Patient", "id": "1", "gender": "M"})
    );
}

#[test]
fn test_custom_code_tables_are_merged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tables.yml");
    fs::write(&path, "tables:\n  \"0004\":\n    codes:\n      I: Inpatient stay\n").unwrap();

    let converter = Hl7ToFhirConverter::builder()
        .with_terminology(&path)
        .build()
        .unwrap();
    let bundle = converter.convert(&text(ADT_A01)).unwrap();
    let resources = resources(&bundle);
    assert_eq!(resources[1]["class"]["display"], "Inpatient stay");
    assert_eq!(
        resources[0]["maritalStatus"]["coding"][0]["display"],
        "Married"
    );
}

#[test]
fn test_without_builtins_nothing_is_supported() {
    let converter = Hl7ToFhirConverter::builder()
        .without_builtins()
        .build()
        .unwrap();
    let err = converter.convert(&text(ADT_A01)).unwrap_err();
    assert!(matches!(err, ConversionError::UnsupportedMessageType { .. }));
}

#[test]
fn test_broken_template_dir_fails_build() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("Broken.yml"),
        "expressions:\n  x:\n    valueOf: datatype/Missing\n",
    )
    .unwrap();
    let err = Hl7ToFhirConverter::builder()
        .with_templates(dir.path())
        .build()
        .unwrap_err();
    assert!(matches!(err, ConversionError::Eval(ref e) if e.is_template_error()));
}

// ============================================================================
// Sharing
// ============================================================================

#[test]
fn test_converter_is_shared_across_threads() {
    let converter = Arc::new(Hl7ToFhirConverter::new().unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let converter = Arc::clone(&converter);
            std::thread::spawn(move || converter.convert(&text(ORU_R01)).unwrap())
        })
        .collect();

    let expected = convert(ORU_R01);
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
