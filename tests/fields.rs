//! Field kinds: decode, encode, and the condition each kind reports.

use ediframe::schema::{builtin, MAX_NUMERIC_WIDTH};
use ediframe::{FieldSpec, Record, RecordError, RecordSchema, SchemaError, Severity, Value};
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn test_numeric_padding() {
    let f = FieldSpec::numeric("count", 4);
    assert_eq!(f.encode(None), "0000");
    assert_eq!(f.encode(Some(&Value::Number(42))), "0042");
    let d = f.decode("0001").expect("decode");
    assert_eq!(d.value, Some(Value::Number(1)));
    assert!(d.issue.is_none());
}

#[test]
fn test_numeric_non_digits_fail_the_record() {
    let f = FieldSpec::numeric("count", 4);
    let err = f.decode("00AB").unwrap_err();
    assert_eq!(
        err,
        RecordError::NotNumeric {
            field: "count".to_string(),
            value: "00AB".to_string()
        }
    );
}

#[test]
fn test_numeric_negative_is_out_of_range() {
    let f = FieldSpec::numeric("count", 4);
    let d = f.decode("  -1").expect("decode");
    assert_eq!(d.value, None);
    assert_eq!(d.issue.expect("issue").severity, Severity::FieldError);
}

#[test]
fn test_numeric_leading_zeros_do_not_count_against_width() {
    let f = FieldSpec::numeric("count", 3);
    let d = f.decode("000042").expect("decode");
    assert_eq!(d.value, Some(Value::Number(42)));
    assert!(d.issue.is_none());
    assert_eq!(f.decode("-0").expect("decode").value, Some(Value::Number(0)));
}

#[test]
fn test_widest_numeric_decodes() {
    let f = FieldSpec::numeric("n", MAX_NUMERIC_WIDTH);
    assert!(f.validate().is_ok());
    let d = f.decode(&"9".repeat(MAX_NUMERIC_WIDTH)).expect("decode");
    assert_eq!(d.value, Some(Value::Number(9_999_999_999_999_999_999)));
    assert!(d.issue.is_none());
}

#[test]
fn test_oversized_digits_are_out_of_range_not_fatal() {
    let f = FieldSpec::numeric("n", 40);
    let d = f.decode(&format!("1{}", "0".repeat(39))).expect("decode");
    assert_eq!(d.value, None);
    assert_eq!(d.issue.expect("issue").severity, Severity::FieldError);

    let f = FieldSpec::numeric("n", 20);
    let d = f.decode("18446744073709551616").expect("decode");
    assert_eq!(d.issue.expect("issue").severity, Severity::FieldError);
    assert!(f.decode("1844674407370955161X").is_err());
}

#[test]
fn test_numeric_wider_than_a_number_is_rejected() {
    let err = FieldSpec::numeric("n", MAX_NUMERIC_WIDTH + 1).validate().unwrap_err();
    assert_eq!(
        err,
        SchemaError::NumericWidth {
            field: "n".to_string(),
            width: 20,
            max: 19
        }
    );
}

#[test]
fn test_mandatory_text() {
    let f = FieldSpec::text("title", 2).mandatory();
    let blank = f.decode("  ").expect("decode");
    assert_eq!(blank.value, None);
    assert_eq!(blank.issue.expect("issue").severity, Severity::FieldError);

    let ok = f.decode("ok").expect("decode");
    assert_eq!(ok.value, Some(Value::text("ok")));
    assert!(ok.issue.is_none());
}

#[test]
fn test_text_strips_and_pads() {
    let f = FieldSpec::text("title", 6);
    assert_eq!(f.decode(" AB   ").expect("decode").value, Some(Value::text("AB")));
    assert_eq!(f.encode(Some(&Value::text("AB"))), "AB    ");
    assert_eq!(f.encode(Some(&Value::text("ABCDEFGH"))), "ABCDEF");
    assert_eq!(f.encode(None), "      ");
}

#[test]
fn test_flag_unknown_satisfies_mandatory() {
    let f = FieldSpec::flag("grand_rights").mandatory();
    let unknown = f.decode("U").expect("decode");
    assert_eq!(unknown.value, None);
    assert!(unknown.issue.is_none());

    let blank = f.decode(" ").expect("decode");
    assert_eq!(blank.value, None);
    assert_eq!(blank.issue.expect("issue").severity, Severity::FieldError);

    assert_eq!(f.encode(None), "U");
    assert_eq!(FieldSpec::flag("optional").encode(None), " ");
}

#[test]
fn test_flag_and_boolean_codes() {
    let flag = FieldSpec::flag("f");
    assert_eq!(flag.decode("Y").expect("decode").value, Some(Value::Bool(true)));
    assert_eq!(flag.decode("N").expect("decode").value, Some(Value::Bool(false)));
    let bad = flag.decode("X").expect("decode");
    assert_eq!(bad.issue.expect("issue").severity, Severity::FieldError);

    let boolean = FieldSpec::boolean("b");
    assert_eq!(boolean.decode("N").expect("decode").value, Some(Value::Bool(false)));
    let bad = boolean.decode("U").expect("decode");
    assert_eq!(bad.issue.expect("issue").severity, Severity::FieldError);
    assert_eq!(boolean.encode(Some(&Value::Bool(true))), "Y");
    assert_eq!(boolean.encode(None), " ");
}

#[test]
fn test_constant_mismatch_is_only_a_warning() {
    let f = FieldSpec::constant("record_type", 3, Some("TRL"));
    let d = f.decode("ABC").expect("decode");
    assert_eq!(d.value, Some(Value::text("ABC")));
    assert_eq!(d.issue.expect("issue").severity, Severity::Warning);

    assert!(f.decode("TRL").expect("decode").issue.is_none());
    assert_eq!(f.encode(Some(&Value::text("ABC"))), "TRL");
}

#[test]
fn test_enumerated_codes_and_labels() {
    let f = FieldSpec::enumerated("language", 2, [("EN", "English"), ("FR", "French")]);
    let d = f.decode("FR").expect("decode");
    assert_eq!(d.value, Some(Value::text("FR")));
    assert!(d.issue.is_none());
    assert_eq!(f.verbose_label(d.value.as_ref()).as_deref(), Some("French"));

    let unknown = f.decode("XX").expect("decode");
    assert_eq!(unknown.value, Some(Value::text("XX")));
    assert_eq!(unknown.issue.expect("issue").severity, Severity::FieldError);

    assert!(f.decode("  ").expect("decode").value.is_none());
}

#[test]
fn test_flag_labels() {
    let f = FieldSpec::flag("f");
    assert_eq!(f.verbose_label(Some(&Value::Bool(true))).as_deref(), Some("Yes"));
    assert_eq!(f.verbose_label(None).as_deref(), Some("Unknown"));
}

#[test]
fn test_check_assigned_values() {
    let f = FieldSpec::numeric("count", 2);
    assert!(f.check(Some(&Value::Number(99))).is_none());
    assert_eq!(f.check(Some(&Value::Number(100))).expect("issue").severity, Severity::FieldError);
    let m = FieldSpec::text("title", 4).mandatory();
    assert_eq!(m.check(None).expect("issue").severity, Severity::FieldError);
}

/// One column of every kind after the type code.
fn mixed() -> Arc<RecordSchema> {
    Arc::new(
        builtin::record()
            .extend("MIX")
            .field(FieldSpec::constant("version", 3, Some("V21")))
            .field(FieldSpec::enumerated("language", 2, [("EN", "English"), ("FR", "French")]))
            .field(FieldSpec::flag("grand_rights"))
            .field(FieldSpec::boolean("active"))
            .field(FieldSpec::numeric("count", 4))
            .field(FieldSpec::text("title", 5))
            .build()
            .expect("schema"),
    )
}

const FIELDS: [&str; 6] = ["version", "language", "grand_rights", "active", "count", "title"];

proptest! {
    #[test]
    fn prop_mixed_record_encodes_to_canonical_line(
        version in prop::sample::select(vec!["V21", "V20", "   "]),
        language in prop::sample::select(vec!["EN", "FR", "DE", "  "]),
        flag in "[YNU ]",
        active in "[YN ]",
        count in 0u32..10_000,
        title in "[A-Z]{0,5}",
    ) {
        let line = format!("MIX{}{}{}{}{:04}{:<5}", version, language, flag, active, count, title);
        let record = Record::decode(mixed(), &line, None).unwrap();
        let encoded = record.encode();
        prop_assert_eq!(encoded.len(), line.len());
        prop_assert_eq!(&encoded[3..6], "V21");
        prop_assert_eq!(&encoded[6..8], language);
        prop_assert_eq!(&encoded[9..], &line[9..]);
        if flag != "U" {
            prop_assert_eq!(&encoded[8..9], flag.as_str());
        }

        let again = Record::decode(mixed(), &encoded, None).unwrap();
        prop_assert_eq!(again.encode(), encoded.clone());
        for name in FIELDS.iter().filter(|n| **n != "version") {
            prop_assert_eq!(again.get(name), record.get(name));
        }
    }

    #[test]
    fn prop_numeric_round_trip(n in 0u64..100_000_000) {
        let f = FieldSpec::numeric("n", 8);
        let encoded = f.encode(Some(&Value::Number(n)));
        prop_assert_eq!(encoded.len(), 8);
        prop_assert_eq!(f.decode(&encoded).unwrap().value, Some(Value::Number(n)));
    }

    #[test]
    fn prop_text_round_trip(s in "[A-Z0-9]([A-Z0-9 ]{0,8}[A-Z0-9])?") {
        let f = FieldSpec::text("t", 10);
        let encoded = f.encode(Some(&Value::text(s.clone())));
        prop_assert_eq!(encoded.chars().count(), 10);
        prop_assert_eq!(f.decode(&encoded).unwrap().value, Some(Value::text(s)));
    }
}
