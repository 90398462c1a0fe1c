//! Conversion benchmarks using divan
//!
//! Message parsing, single expressions and whole-message conversion.

use octofhir_hl7::Hl7ToFhirConverter;
use octofhir_hl7::eval::{Condition, Hl7DataExtractor, Specification};

fn main() {
    divan::main();
}

const ADT_A01: &str = "MSH|^~\\&|SE050|050|PACS|050|20120912011230||ADT^A01|102|T|2.6\r\
PID|1||1234^^^^MR~5678^^^^SS||DOE^JOHN^A^^DR||20000101|M|||123 MAIN ST^^SAN DIEGO^CA^92101^USA||(555)555-1234^PRN^PH|||M\r\
PV1|1|I|||||||||||||||||1400|||||||||||||||||||||||||20120912011230|20120915103000";

fn oru(observations: usize) -> String {
    let mut text = String::from(
        "MSH|^~\\&|LAB|FAC|EHR|FAC|20200102090000||ORU^R01|2|P|2.5\rPID|1||1234^^^^MR||DOE^JANE||19800101|F",
    );
    for i in 1..=observations {
        text.push_str(&format!(
            "\rOBX|{}|NM|2345-7^Glucose^LN||{}|mg/dL|70-105|H|||F|||20200102083000",
            i,
            100 + i
        ));
    }
    text
}

// === Parsing ===

mod parsing {
    use super::*;

    #[divan::bench]
    fn parse_message(bencher: divan::Bencher) {
        bencher.bench_local(|| octofhir_hl7::message::parse(divan::black_box(ADT_A01)));
    }

    #[divan::bench]
    fn parse_specification(bencher: divan::Bencher) {
        bencher.bench_local(|| Specification::parse(divan::black_box("PID.3.1:STRING*"), false, false));
    }

    #[divan::bench]
    fn parse_condition(bencher: divan::Bencher) {
        bencher.bench_local(|| {
            Condition::parse(divan::black_box("$status EQUALS F AND $value NOT_NULL OR $flag NULL"))
        });
    }
}

// === Conversion ===

mod conversion {
    use super::*;
    use octofhir_hl7::eval::DataTypeConverter;

    #[divan::bench]
    fn extract_path(bencher: divan::Bencher) {
        let accessor = Hl7DataExtractor::new(octofhir_hl7::message::parse(ADT_A01).unwrap());
        let spec = Specification::parse("PID.3.1*", false, false).unwrap();
        let converter = DataTypeConverter::default();
        bencher.bench_local(|| spec.extract_value_for_spec(&accessor, None, &converter));
    }

    #[divan::bench]
    fn convert_adt(bencher: divan::Bencher) {
        let converter = Hl7ToFhirConverter::new().unwrap();
        bencher.bench_local(|| converter.convert(divan::black_box(ADT_A01)));
    }

    #[divan::bench(args = [1, 10, 50])]
    fn convert_oru(bencher: divan::Bencher, observations: usize) {
        let converter = Hl7ToFhirConverter::new().unwrap();
        let text = oru(observations);
        bencher.bench_local(|| converter.convert(divan::black_box(&text)));
    }
}
