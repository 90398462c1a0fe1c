//! Templates and code tables shipped with the crate
//!
//! The built-in set covers ADT^A01 (Patient, Encounter) and ORU^R01
//! (Patient, Observation). Custom template directories are layered on top:
//! a custom template with the same name replaces the built-in one.

use octofhir_hl7_eval::{EvalResult, InMemoryTerminology, TemplateRegistry};

/// Built-in templates as `(name, yaml)` pairs
pub const TEMPLATES: &[(&str, &str)] = &[
    ("datatype/Address", include_str!("../templates/datatype/Address.yml")),
    ("datatype/ContactPoint", include_str!("../templates/datatype/ContactPoint.yml")),
    ("datatype/HumanName", include_str!("../templates/datatype/HumanName.yml")),
    ("datatype/Identifier", include_str!("../templates/datatype/Identifier.yml")),
    ("datatype/Period", include_str!("../templates/datatype/Period.yml")),
    ("datatype/Quantity", include_str!("../templates/datatype/Quantity.yml")),
    ("resource/Encounter", include_str!("../templates/resource/Encounter.yml")),
    ("resource/Observation", include_str!("../templates/resource/Observation.yml")),
    ("resource/Patient", include_str!("../templates/resource/Patient.yml")),
    ("message/ADT_A01", include_str!("../templates/message/ADT_A01.yml")),
    ("message/ORU_R01", include_str!("../templates/message/ORU_R01.yml")),
];

const HL7_TABLES: &str = include_str!("../terminology/hl7_tables.yml");

/// Registry holding every built-in template, not yet validated
pub fn templates() -> EvalResult<TemplateRegistry> {
    let mut registry = TemplateRegistry::new();
    for (name, yaml) in TEMPLATES {
        registry.register_yaml(name, yaml)?;
    }
    Ok(registry)
}

/// Built-in HL7 tables and coding system names
pub fn terminology() -> EvalResult<InMemoryTerminology> {
    InMemoryTerminology::from_yaml("builtin:hl7_tables", HL7_TABLES)
}
