//! File framing: lazy groups and transactions, drain on advance, count reconciliation,
//! and the structural errors at each level.

use ediframe::{
    Counter, EdiFile, FrameError, ReadOptions, Registry, Severity, StructuralError, TextEncoding, Transaction,
};
use std::io::{BufReader, Write};

const HDR: &str = "HDRSENDER";
const GRH1: &str = "GRHNWR00001";
const NWR0: &str = "NWR0000000000000000";
const SPU0: &str = "SPU0000000000000001";
const NWR1: &str = "NWR0000000100000000";
const GRT1: &str = "GRT000010000000200000005";
const TRL1: &str = "TRL000010000000200000007";

const GRH2: &str = "GRHREV00002";
const REV0: &str = "REV0000000000000000";
const GRT2: &str = "GRT000020000000100000003";
const TRL2: &str = "TRL000020000000300000010";

fn text(lines: &[&str]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn open(text: &str) -> EdiFile<&[u8]> {
    EdiFile::from_text(text, Registry::standard().into_shared()).expect("open")
}

fn all_transactions(file: &mut EdiFile<&[u8]>) -> Result<Vec<Vec<Transaction>>, FrameError> {
    let mut groups = Vec::new();
    while let Some(group) = file.next_group()? {
        groups.push(group.collect::<Result<Vec<_>, _>>()?);
    }
    Ok(groups)
}

#[test]
fn test_valid_file_walk() {
    let src = text(&[HDR, GRH1, NWR0, SPU0, NWR1, GRT1, TRL1]);
    let mut file = open(&src);
    assert!(file.is_valid());
    let header = file.header().expect("header");
    assert_eq!(header.text("record_type"), Some("HDR"));
    assert_eq!(header.tail(), "SENDER");

    let mut group = file.next_group().expect("next").expect("group");
    assert_eq!(group.type_code(), "NWR");
    assert_eq!(group.sequence(), 1);
    let t0 = group.next_transaction().expect("read").expect("t0");
    assert_eq!(t0.sequence(), 0);
    assert_eq!(t0.len(), 2);
    assert!(t0.is_valid());
    let t1 = group.next_transaction().expect("read").expect("t1");
    assert_eq!(t1.sequence(), 1);
    assert_eq!(t1.len(), 1);
    assert!(group.next_transaction().expect("read").is_none());
    let group = group.finish().expect("finish");
    assert!(group.is_valid());
    assert_eq!(group.transaction_count(), 2);
    assert_eq!(group.record_count(), 5);
    assert!(group.trailer().is_some());

    assert!(file.next_group().expect("next").is_none());
    assert!(file.is_finished());
    assert!(file.is_valid(), "{:?}", file.errors());
    assert_eq!(file.group_count(), 1);
    assert_eq!(file.transaction_count(), 2);
    assert_eq!(file.record_count(), 7);
    assert!(file.next_group().expect("after end").is_none());
}

#[test]
fn test_read_all_re_encodes_input() {
    let src = text(&[HDR, GRH1, NWR0, SPU0, NWR1, GRT1, GRH2, REV0, GRT2, TRL2]);
    let decoded = open(&src).read_all().expect("read");
    assert!(decoded.valid, "{:?}", decoded.errors);
    assert_eq!(decoded.groups.len(), 2);
    assert_eq!(decoded.transactions().count(), 3);
    assert_eq!(decoded.groups[1].group.type_code(), "REV");
    assert_eq!(decoded.encode(), src);
}

#[test]
fn test_group_transaction_count_mismatch() {
    let grt = "GRT000010000000300000005";
    let src = text(&[HDR, GRH1, NWR0, SPU0, NWR1, grt, TRL1]);
    let mut file = open(&src);
    let groups = all_transactions(&mut file).expect("walk");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);

    let group = &file.groups()[0];
    assert!(!group.is_valid());
    assert!(!file.is_valid());
    assert_eq!(
        group.errors(),
        [StructuralError::CountMismatch {
            marker: "GRT",
            counter: Counter::Transactions,
            declared: Some(3),
            counted: 2
        }]
    );
    let trailer = group.trailer().expect("trailer");
    assert_eq!(trailer.issue("transaction_count").expect("issue").severity, Severity::FileError);
    assert!(trailer.issue("record_count").is_none());
}

#[test]
fn test_file_record_count_mismatch() {
    let trl = "TRL000010000000200000009";
    let src = text(&[HDR, GRH1, NWR0, SPU0, NWR1, GRT1, trl]);
    let mut file = open(&src);
    all_transactions(&mut file).expect("walk");
    assert!(!file.is_valid());
    assert!(file.groups()[0].is_valid());
    assert_eq!(
        file.errors(),
        [StructuralError::CountMismatch {
            marker: "TRL",
            counter: Counter::Records,
            declared: Some(9),
            counted: 7
        }]
    );
    let trailer = file.trailer().expect("trailer");
    assert_eq!(trailer.issue("record_count").expect("issue").severity, Severity::FileError);
}

#[test]
fn test_abandoned_group_is_drained() {
    let src = text(&[HDR, GRH1, NWR0, SPU0, NWR1, GRT1, GRH2, REV0, GRT2, TRL2]);
    let mut file = open(&src);
    {
        let mut group = file.next_group().expect("next").expect("group 1");
        group.next_transaction().expect("read").expect("t0");
    }
    let group = file.next_group().expect("next").expect("group 2");
    assert_eq!(group.sequence(), 2);
    assert_eq!(group.type_code(), "REV");
    drop(group);
    assert!(file.next_group().expect("next").is_none());
    assert!(file.is_valid(), "{:?}", file.errors());
    assert_eq!(file.transaction_count(), 3);
    assert_eq!(file.record_count(), 10);
    assert!(file.groups().iter().all(|g| g.is_drained()));
}

#[test]
fn test_drained_group_cannot_be_reentered() {
    let src = text(&[HDR, GRH1, NWR0, GRT1, TRL1]);
    let mut file = open(&src);
    let mut group = file.next_group().expect("next").expect("group");
    while group.next_transaction().expect("read").is_some() {}
    let err = group.next_transaction().unwrap_err();
    assert!(matches!(err, FrameError::GroupDrained { group: 1 }));
}

#[test]
fn test_drained_group_iterated_again_is_an_error() {
    let src = text(&[HDR, GRH1, NWR0, SPU0, NWR1, GRT1, TRL1]);
    let mut file = open(&src);
    let mut group = file.next_group().expect("next").expect("group");
    let first: Vec<_> = group.by_ref().collect::<Result<_, _>>().expect("first pass");
    assert_eq!(first.len(), 2);
    let second = group.by_ref().collect::<Result<Vec<_>, _>>();
    assert!(matches!(second, Err(FrameError::GroupDrained { group: 1 })));
    assert!(group.next().is_none());
}

#[test]
fn test_group_code_mismatch_does_not_abort() {
    let grh = "GRHNWR00002";
    let src = text(&[HDR, grh, NWR0, SPU0, NWR1, GRT1, TRL1]);
    let mut file = open(&src);
    let groups = all_transactions(&mut file).expect("walk");
    assert_eq!(groups[0].len(), 2);
    let group = &file.groups()[0];
    assert!(!group.is_valid());
    assert_eq!(group.header().issue("group_code").expect("issue").severity, Severity::FileError);
    assert_eq!(
        group.errors(),
        [StructuralError::GroupCode {
            marker: "GRH",
            found: Some(2),
            expected: 1
        }]
    );
    assert!(!file.is_valid());
    assert!(file.is_finished());
}

#[test]
fn test_sequence_errors_reach_group_and_file() {
    let bad = "SPU0000000000000005";
    let src = text(&[HDR, GRH1, NWR0, bad, NWR1, GRT1, TRL1]);
    let mut file = open(&src);
    let groups = all_transactions(&mut file).expect("walk");
    assert!(!groups[0][0].is_valid());
    assert!(groups[0][1].is_valid());
    let group = &file.groups()[0];
    assert!(!group.is_valid());
    assert!(matches!(group.errors()[0], StructuralError::RecordSequence { record: 1, .. }));
    assert!(!file.is_valid());
}

#[test]
fn test_missing_group_trailer_is_fatal() {
    let src = text(&[HDR, GRH1, NWR0, TRL1]);
    let mut file = open(&src);
    let mut group = file.next_group().expect("next").expect("group");
    let err = group.next_transaction().unwrap_err();
    assert!(matches!(
        err,
        FrameError::Structural(StructuralError::GroupTrailerMissing { group: 1, line: Some(4) })
    ));
    drop(group);
    assert!(!file.is_valid());
    assert!(matches!(file.next_group(), Err(FrameError::Structural(_))));
}

#[test]
fn test_group_trailer_missing_at_end_of_input() {
    let src = text(&[HDR, GRH1, NWR0]);
    let mut file = open(&src);
    let err = all_transactions(&mut file).unwrap_err();
    assert!(matches!(
        err,
        FrameError::Structural(StructuralError::GroupTrailerMissing { group: 1, line: None })
    ));
}

#[test]
fn test_missing_file_trailer_is_fatal() {
    let src = text(&[HDR, GRH1, NWR0, GRT1]);
    let mut file = open(&src);
    let err = all_transactions(&mut file).unwrap_err();
    assert!(matches!(err, FrameError::Structural(StructuralError::TrailerMissing)));
    assert!(!file.is_valid());
    assert_eq!(file.errors(), [StructuralError::TrailerMissing]);
}

#[test]
fn test_missing_group_header_is_fatal() {
    let src = text(&[HDR, NWR0, GRT1, TRL1]);
    let mut file = open(&src);
    match file.next_group() {
        Err(FrameError::Structural(StructuralError::GroupHeaderMissing { group, line, found })) => {
            assert_eq!(group, 1);
            assert_eq!(line, 2);
            assert_eq!(found, NWR0);
        }
        other => panic!("expected missing group header, got {:?}", other.map(|g| g.is_some())),
    }
}

#[test]
fn test_missing_file_header_is_recorded() {
    let src = text(&[GRH1, NWR0, SPU0, NWR1, GRT1, TRL1]);
    let mut file = open(&src);
    assert!(!file.is_valid());
    assert!(matches!(file.errors()[0], StructuralError::HeaderMissing { line: 1, .. }));
    assert!(file.header().is_none());
    let groups = all_transactions(&mut file).expect("walk");
    assert_eq!(groups[0].len(), 2);
    assert!(file.is_finished());
}

#[test]
fn test_missing_file_header_is_not_invented_on_encode() {
    let src = text(&[GRH1, NWR0, SPU0, NWR1, GRT1, TRL1]);
    let decoded = open(&src).read_all().expect("read");
    assert!(decoded.header.is_none());
    assert!(!decoded.valid);
    let encoded = decoded.encode();
    assert_eq!(encoded, src);
    let again = open(&encoded).read_all().expect("read again");
    assert_eq!(again.groups[0].transactions.len(), 2);
}

#[test]
fn test_content_after_trailer() {
    let src = text(&[HDR, GRH1, NWR0, SPU0, NWR1, GRT1, TRL1, "XYZ"]);
    let mut file = open(&src);
    all_transactions(&mut file).expect("walk");
    assert!(!file.is_valid());
    assert_eq!(file.errors(), [StructuralError::ContentAfterTrailer { line: 8 }]);
}

#[test]
fn test_too_short_marker_falls_back() {
    let src = text(&[HDR, GRH1, NWR0, "GRT", TRL1]);
    let mut file = open(&src);
    all_transactions(&mut file).expect("walk");
    let group = &file.groups()[0];
    assert!(!group.is_valid());
    let trailer = group.trailer().expect("trailer");
    assert_eq!(trailer.record_issue().expect("issue").severity, Severity::RecordError);
    assert_eq!(trailer.encode(), "GRT");
}

#[test]
fn test_latin1_file_on_disk() {
    let mut tmp = tempfile::NamedTempFile::new().expect("tempfile");
    tmp.write_all(b"HDRCAF\xc9\r\n\r\nGRHNWR00001\r\nNWR0000000000000000\r\nGRT000010000000100000003\r\nTRL000010000000100000005\r\n")
        .expect("write");
    tmp.flush().expect("flush");
    let reader = BufReader::new(std::fs::File::open(tmp.path()).expect("reopen"));
    let options = ReadOptions::default().with_encoding(TextEncoding::Latin1);
    let decoded = EdiFile::open(reader, Registry::standard().into_shared(), options)
        .expect("open")
        .read_all()
        .expect("read");
    assert_eq!(decoded.header.as_ref().expect("header").tail(), "CAFÉ");
    assert!(decoded.valid, "{:?}", decoded.errors);
    assert_eq!(decoded.groups[0].transactions.len(), 1);
}
