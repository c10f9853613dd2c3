//! Transactions: runs of records opened by a line carrying the group's transaction type code.

use crate::error::StructuralError;
use crate::record::Record;
use crate::registry::SchemaLookup;
use crate::schema::TYPE_CODE_WIDTH;

const TRANSACTION_SEQUENCE: &str = "transaction_sequence_number";
const RECORD_SEQUENCE: &str = "record_sequence_number";

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    type_code: String,
    sequence: u64,
    records: Vec<Record>,
    valid: bool,
    errors: Vec<StructuralError>,
}

impl Transaction {
    /// Empty transaction for building output.
    pub fn new(type_code: impl Into<String>, sequence: u64) -> Self {
        Transaction {
            type_code: type_code.into(),
            sequence,
            records: Vec::new(),
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Decode every line of one transaction.
    ///
    /// A line that fails to decode is replaced by an opaque record carrying the failure, and
    /// decoding moves on to the next line. Each decoded record's sequence fields must match the
    /// transaction's own position and the record's position inside it.
    pub fn decode<S: AsRef<str>>(type_code: &str, lines: &[S], sequence: u64, lookup: &dyn SchemaLookup) -> Self {
        let mut transaction = Transaction::new(type_code, sequence);
        for (i, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            let prefix: String = line.chars().take(TYPE_CODE_WIDTH).collect();
            let schema = lookup.schema_or_default(&prefix);
            let record = match Record::decode(schema, line, Some(i)) {
                Ok(mut record) => {
                    for error in validate_sequences(&mut record, sequence, i as u64) {
                        tracing::warn!(transaction = sequence, record = i, %error, "sequence mismatch");
                        transaction.errors.push(error);
                    }
                    record
                }
                Err(e) => {
                    tracing::debug!(transaction = sequence, record = i, error = %e, "record replaced by fallback");
                    Record::opaque(line, Some(i), e.to_issue())
                }
            };
            transaction.push(record);
        }
        lookup.validate_transaction(&mut transaction);
        transaction.valid &= transaction.errors.is_empty();
        tracing::trace!(
            type_code,
            sequence,
            records = transaction.records.len(),
            valid = transaction.valid,
            "transaction decoded"
        );
        transaction
    }

    /// Append a record. An invalid record invalidates the transaction.
    pub fn push(&mut self, record: Record) {
        self.valid &= record.is_valid();
        self.records.push(record);
    }

    pub fn type_code(&self) -> &str {
        &self.type_code
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Structural errors found inside this transaction.
    pub fn errors(&self) -> &[StructuralError] {
        &self.errors
    }

    /// Record a structural error found by an enclosing level.
    pub fn invalidate(&mut self, error: StructuralError) {
        self.valid = false;
        self.errors.push(error);
    }

    /// Encoded lines, one per record.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.records.iter().map(Record::encode)
    }

    /// All records encoded, newline-separated, without a trailing newline.
    pub fn encode(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }

    /// Overwrite the sequence fields of every record with their expected values.
    pub(crate) fn stamp_sequences(&mut self, sequence: u64) {
        self.sequence = sequence;
        for (i, record) in self.records.iter_mut().enumerate() {
            if record.has_field(TRANSACTION_SEQUENCE) {
                let _ = record.set_value(TRANSACTION_SEQUENCE, Some(sequence.into()));
            }
            if record.has_field(RECORD_SEQUENCE) {
                let _ = record.set_value(RECORD_SEQUENCE, Some((i as u64).into()));
            }
            record.set_sequence(Some(i));
        }
    }
}

fn validate_sequences(record: &mut Record, transaction: u64, position: u64) -> Vec<StructuralError> {
    let mut errors = Vec::new();
    let record_index = position as usize;
    if record.has_field(TRANSACTION_SEQUENCE) {
        let found = record.number(TRANSACTION_SEQUENCE);
        if found != Some(transaction) {
            let e = StructuralError::TransactionSequence {
                record: record_index,
                found,
                expected: transaction,
            };
            let _ = record.attach(Some(TRANSACTION_SEQUENCE), e.to_issue());
            errors.push(e);
        }
    }
    if record.has_field(RECORD_SEQUENCE) {
        let found = record.number(RECORD_SEQUENCE);
        if found != Some(position) {
            let e = StructuralError::RecordSequence {
                record: record_index,
                found,
                expected: position,
            };
            let _ = record.attach(Some(RECORD_SEQUENCE), e.to_issue());
            errors.push(e);
        }
    }
    errors
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:08}", self.type_code, self.sequence)
    }
}
