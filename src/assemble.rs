//! Build a well-framed file from a header and groups of transactions.
//!
//! The assembler owns the bookkeeping a reader checks: sequence numbers inside transactions,
//! group codes, and the counts carried by GRT and TRL. Output read back with
//! [`EdiFile`](crate::frame::EdiFile) reconciles cleanly.

use crate::error::{Counter, SchemaError};
use crate::frame::{DecodedFile, DecodedGroup, Group};
use crate::record::Record;
use crate::registry::SchemaLookup;
use crate::schema::{GRH, GRT, TRL};
use crate::transaction::Transaction;
use crate::value::Value;
use std::sync::Arc;

#[derive(Debug)]
pub struct FileAssembler {
    lookup: Arc<dyn SchemaLookup>,
    header: Record,
    groups: Vec<(String, Vec<Transaction>)>,
}

impl FileAssembler {
    pub fn new(header: Record, lookup: Arc<dyn SchemaLookup>) -> Self {
        FileAssembler {
            lookup,
            header,
            groups: Vec::new(),
        }
    }

    /// Append a group carrying transactions of `type_code`.
    pub fn group(mut self, type_code: impl Into<String>, transactions: Vec<Transaction>) -> Self {
        self.push_group(type_code, transactions);
        self
    }

    pub fn push_group(&mut self, type_code: impl Into<String>, transactions: Vec<Transaction>) {
        self.groups.push((type_code.into(), transactions));
    }

    /// Stamp sequences, create the marker records, and fill in every count.
    pub fn build(self) -> Result<DecodedFile, SchemaError> {
        let mut groups = Vec::with_capacity(self.groups.len());
        let mut transaction_total = 0u64;
        // file header and trailer
        let mut record_total = 2u64;
        for (i, (type_code, mut transactions)) in self.groups.into_iter().enumerate() {
            let sequence = i as u64 + 1;
            for (j, transaction) in transactions.iter_mut().enumerate() {
                transaction.stamp_sequences(j as u64);
            }
            let mut header = Record::new(self.lookup.schema_or_default(GRH));
            set_if_present(&mut header, "transaction_type", Value::text(&type_code))?;
            set_if_present(&mut header, "group_code", sequence.into())?;

            let records = 2 + transactions.iter().map(|t| t.len() as u64).sum::<u64>();
            let mut trailer = Record::new(self.lookup.schema_or_default(GRT));
            set_if_present(&mut trailer, "group_code", sequence.into())?;
            set_if_present(&mut trailer, Counter::Transactions.field_name(), (transactions.len() as u64).into())?;
            set_if_present(&mut trailer, Counter::Records.field_name(), records.into())?;

            transaction_total += transactions.len() as u64;
            record_total += records;
            let group = Group::assembled(sequence, type_code, header, trailer, &transactions);
            groups.push(DecodedGroup { group, transactions });
        }

        let mut trailer = Record::new(self.lookup.schema_or_default(TRL));
        set_if_present(&mut trailer, Counter::Groups.field_name(), (groups.len() as u64).into())?;
        set_if_present(&mut trailer, Counter::Transactions.field_name(), transaction_total.into())?;
        set_if_present(&mut trailer, Counter::Records.field_name(), record_total.into())?;

        let valid = self.header.is_valid() && trailer.is_valid() && groups.iter().all(|g| g.group.is_valid());
        tracing::debug!(groups = groups.len(), transactions = transaction_total, records = record_total, "file assembled");
        Ok(DecodedFile {
            header: Some(self.header),
            trailer: Some(trailer),
            groups,
            valid,
            errors: Vec::new(),
        })
    }

    /// Build and encode in one step.
    pub fn encode(self) -> Result<String, SchemaError> {
        Ok(self.build()?.encode())
    }
}

fn set_if_present(record: &mut Record, field: &str, value: Value) -> Result<(), SchemaError> {
    if record.has_field(field) {
        record.set_value(field, Some(value))?;
    }
    Ok(())
}
