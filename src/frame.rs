//! File framing: header, groups of transactions, trailer.
//!
//! An [`EdiFile`] reads lazily. [`EdiFile::next_group`] hands out a [`GroupCursor`] that yields
//! the group's transactions one at a time; asking for the next group first drains whatever
//! is left of the current one, so counters stay exact even when the caller skips ahead.
//! The file owns every [`Group`] summary it has opened, and invalidity found at any level is
//! folded into the enclosing group and file as soon as it is seen.

use crate::cursor::{LineCursor, ReadOptions, TextEncoding};
use crate::error::{Counter, FrameError, StructuralError};
use crate::record::Record;
use crate::registry::SchemaLookup;
use crate::schema::{GRH, GRT, HDR, TRL, TYPE_CODE_WIDTH};
use crate::transaction::Transaction;
use std::io::BufRead;
use std::sync::Arc;

const GROUP_CODE: &str = "group_code";
const TRANSACTION_TYPE: &str = "transaction_type";

#[derive(Debug, Clone, PartialEq)]
enum GroupState {
    Open,
    Drained,
    Failed(StructuralError),
}

/// One group: header and trailer records plus running counters.
///
/// Transactions are not kept here; they go to the caller as they are read.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    type_code: String,
    sequence: u64,
    header: Record,
    trailer: Option<Record>,
    transaction_count: u64,
    record_count: u64,
    valid: bool,
    errors: Vec<StructuralError>,
    state: GroupState,
}

impl Group {
    fn open(sequence: u64, type_code: String, header: Record) -> Self {
        Group {
            type_code,
            sequence,
            header,
            trailer: None,
            transaction_count: 0,
            // the group's own header and trailer
            record_count: 2,
            valid: true,
            errors: Vec::new(),
            state: GroupState::Open,
        }
    }

    /// A group built for output, already closed.
    pub(crate) fn assembled(sequence: u64, type_code: String, header: Record, trailer: Record, transactions: &[Transaction]) -> Self {
        let mut group = Group::open(sequence, type_code, header);
        group.transaction_count = transactions.len() as u64;
        group.record_count += transactions.iter().map(|t| t.len() as u64).sum::<u64>();
        group.valid = group.header.is_valid() && trailer.is_valid() && transactions.iter().all(Transaction::is_valid);
        group.trailer = Some(trailer);
        group.state = GroupState::Drained;
        group
    }

    /// Transaction type code announced by the group header.
    pub fn type_code(&self) -> &str {
        &self.type_code
    }

    /// 1-based position of the group in the file.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn header(&self) -> &Record {
        &self.header
    }

    /// Present once the group has been drained.
    pub fn trailer(&self) -> Option<&Record> {
        self.trailer.as_ref()
    }

    /// Transactions read so far.
    pub fn transaction_count(&self) -> u64 {
        self.transaction_count
    }

    /// Lines read so far, counting the group header and trailer.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &[StructuralError] {
        &self.errors
    }

    /// True once the group trailer has been read.
    pub fn is_drained(&self) -> bool {
        self.state == GroupState::Drained
    }

    fn invalidate(&mut self, error: StructuralError) {
        tracing::warn!(group = self.sequence, %error, "group invalid");
        self.valid = false;
        self.errors.push(error);
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FileState {
    Groups,
    Finished,
    Failed(StructuralError),
}

/// Lazily framed EDI file over a line source.
#[derive(Debug)]
pub struct EdiFile<R> {
    cursor: LineCursor<R>,
    lookup: Arc<dyn SchemaLookup>,
    header: Option<Record>,
    trailer: Option<Record>,
    valid: bool,
    errors: Vec<StructuralError>,
    group_count: u64,
    transaction_count: u64,
    record_count: u64,
    groups: Vec<Group>,
    active: Option<usize>,
    state: FileState,
}

impl<'a> EdiFile<&'a [u8]> {
    /// Frame in-memory text. The text is already UTF-8, so it is read as such.
    pub fn from_text(text: &'a str, lookup: Arc<dyn SchemaLookup>) -> Result<Self, FrameError> {
        EdiFile::open(text.as_bytes(), lookup, ReadOptions::default().with_encoding(TextEncoding::Utf8))
    }
}

impl<R: BufRead> EdiFile<R> {
    /// Read and decode the file header. A first line that is not `HDR` is recorded as a
    /// structural error and left in place for group scanning.
    pub fn open(reader: R, lookup: Arc<dyn SchemaLookup>, options: ReadOptions) -> Result<Self, FrameError> {
        let mut cursor = LineCursor::new(reader, options.encoding);
        let first = cursor.peek()?.map(|l| (type_prefix(l), l.to_string()));
        let mut errors = Vec::new();
        let header = match first {
            Some((code, _)) if code == HDR => {
                let line = cursor.take()?.unwrap_or_default();
                Some(decode_or_fallback(lookup.as_ref(), HDR, &line))
            }
            other => {
                let found = other.map(|(_, line)| line).unwrap_or_default();
                let error = StructuralError::HeaderMissing {
                    line: cursor.line_number(),
                    found,
                };
                tracing::warn!(%error, "file invalid");
                errors.push(error);
                None
            }
        };
        let valid = header.as_ref().is_some_and(Record::is_valid) && errors.is_empty();
        tracing::debug!(valid, "file header read");
        Ok(EdiFile {
            cursor,
            lookup,
            header,
            trailer: None,
            valid,
            errors,
            group_count: 0,
            transaction_count: 0,
            // the file's own header and trailer
            record_count: 2,
            groups: Vec::new(),
            active: None,
            state: FileState::Groups,
        })
    }

    /// `None` when the first line was not a file header.
    pub fn header(&self) -> Option<&Record> {
        self.header.as_ref()
    }

    /// Present once the file trailer has been read.
    pub fn trailer(&self) -> Option<&Record> {
        self.trailer.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &[StructuralError] {
        &self.errors
    }

    /// Groups opened so far.
    pub fn group_count(&self) -> u64 {
        self.group_count
    }

    /// Transactions of drained groups.
    pub fn transaction_count(&self) -> u64 {
        self.transaction_count
    }

    /// Lines of drained groups plus the file header and trailer.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Summaries of every group opened so far, in file order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// True once the file trailer has been read.
    pub fn is_finished(&self) -> bool {
        self.state == FileState::Finished
    }

    /// Advance to the next group, draining the current one first.
    ///
    /// Returns `Ok(None)` after the file trailer, which is reconciled against the counters.
    /// A missing group header, group trailer, or file trailer ends the parse with an error;
    /// the same error is returned by every later call.
    pub fn next_group(&mut self) -> Result<Option<GroupCursor<'_, R>>, FrameError> {
        match &self.state {
            FileState::Finished => return Ok(None),
            FileState::Failed(e) => return Err(e.clone().into()),
            FileState::Groups => {}
        }
        if let Some(index) = self.active.take() {
            self.drain(index)?;
        }
        let next = self.cursor.peek()?.map(|l| (type_prefix(l), l.to_string()));
        match next {
            None => Err(self.fail(StructuralError::TrailerMissing)),
            Some((code, _)) if code == TRL => {
                let line = self.cursor.take()?.unwrap_or_default();
                self.close(&line)?;
                Ok(None)
            }
            Some((code, _)) if code == GRH => {
                let index = self.open_group()?;
                self.active = Some(index);
                Ok(Some(GroupCursor {
                    file: self,
                    index,
                    done: false,
                }))
            }
            Some((_, found)) => {
                let error = StructuralError::GroupHeaderMissing {
                    group: self.group_count + 1,
                    line: self.cursor.line_number(),
                    found,
                };
                Err(self.fail(error))
            }
        }
    }

    /// Read the whole file into memory.
    pub fn read_all(mut self) -> Result<DecodedFile, FrameError> {
        let mut transactions = Vec::new();
        while let Some(mut cursor) = self.next_group()? {
            transactions.push(cursor.by_ref().collect::<Result<Vec<_>, _>>()?);
        }
        let groups = self
            .groups
            .into_iter()
            .zip(transactions)
            .map(|(group, transactions)| DecodedGroup { group, transactions })
            .collect();
        Ok(DecodedFile {
            header: self.header,
            trailer: self.trailer,
            groups,
            valid: self.valid,
            errors: self.errors,
        })
    }

    fn fail(&mut self, error: StructuralError) -> FrameError {
        tracing::warn!(%error, "file framing failed");
        self.valid = false;
        self.errors.push(error.clone());
        self.state = FileState::Failed(error.clone());
        error.into()
    }

    fn open_group(&mut self) -> Result<usize, FrameError> {
        let line = self.cursor.take()?.unwrap_or_default();
        self.group_count += 1;
        let sequence = self.group_count;
        let mut header = decode_or_fallback(self.lookup.as_ref(), GRH, &line);
        let type_code = match header.text(TRANSACTION_TYPE) {
            Some(code) => code.to_string(),
            None => line.chars().skip(TYPE_CODE_WIDTH).take(TYPE_CODE_WIDTH).collect::<String>().trim().to_string(),
        };
        let code_error = check_group_code(&mut header, GRH, sequence);
        let mut group = Group::open(sequence, type_code, header);
        group.valid = group.header.is_valid();
        if let Some(error) = code_error {
            group.invalidate(error);
        }
        self.valid &= group.valid;
        tracing::debug!(group = sequence, type_code = %group.type_code, "group opened");
        self.groups.push(group);
        Ok(self.groups.len() - 1)
    }

    fn drain(&mut self, index: usize) -> Result<(), FrameError> {
        while self.groups[index].state == GroupState::Open {
            self.read_transaction(index)?;
        }
        Ok(())
    }

    fn read_transaction(&mut self, index: usize) -> Result<Option<Transaction>, FrameError> {
        match &self.groups[index].state {
            GroupState::Open => {}
            GroupState::Drained => {
                return Err(FrameError::GroupDrained {
                    group: self.groups[index].sequence,
                })
            }
            GroupState::Failed(e) => return Err(e.clone().into()),
        }
        let mut lines: Vec<String> = Vec::new();
        loop {
            let code = match self.cursor.peek()? {
                Some(line) => type_prefix(line),
                None => return Err(self.fail_group(index, None)),
            };
            if code == GRT {
                if !lines.is_empty() {
                    return Ok(Some(self.finish_transaction(index, &lines)));
                }
                let line = self.cursor.take()?.unwrap_or_default();
                self.close_group(index, &line);
                return Ok(None);
            }
            if code == HDR || code == GRH || code == TRL {
                let line = Some(self.cursor.line_number());
                return Err(self.fail_group(index, line));
            }
            if code == self.groups[index].type_code && !lines.is_empty() {
                return Ok(Some(self.finish_transaction(index, &lines)));
            }
            if let Some(line) = self.cursor.take()? {
                lines.push(line);
            }
        }
    }

    fn finish_transaction(&mut self, index: usize, lines: &[String]) -> Transaction {
        let group = &mut self.groups[index];
        let transaction = Transaction::decode(&group.type_code, lines, group.transaction_count, self.lookup.as_ref());
        group.transaction_count += 1;
        group.record_count += lines.len() as u64;
        if !transaction.is_valid() {
            group.valid = false;
            self.valid = false;
        }
        group.errors.extend(transaction.errors().iter().cloned());
        transaction
    }

    fn fail_group(&mut self, index: usize, line: Option<usize>) -> FrameError {
        let group = &mut self.groups[index];
        let error = StructuralError::GroupTrailerMissing {
            group: group.sequence,
            line,
        };
        group.invalidate(error.clone());
        group.state = GroupState::Failed(error.clone());
        self.fail(error)
    }

    fn close_group(&mut self, index: usize, line: &str) {
        let mut trailer = decode_or_fallback(self.lookup.as_ref(), GRT, line);
        let group = &mut self.groups[index];
        let mut found: Vec<StructuralError> = Vec::new();
        found.extend(check_group_code(&mut trailer, GRT, group.sequence));
        found.extend(reconcile(&mut trailer, GRT, Counter::Transactions, group.transaction_count));
        found.extend(reconcile(&mut trailer, GRT, Counter::Records, group.record_count));
        group.valid &= trailer.is_valid();
        for error in found {
            group.invalidate(error);
        }
        group.trailer = Some(trailer);
        group.state = GroupState::Drained;
        self.valid &= group.valid;
        self.transaction_count += group.transaction_count;
        self.record_count += group.record_count;
        tracing::debug!(
            group = group.sequence,
            transactions = group.transaction_count,
            records = group.record_count,
            valid = group.valid,
            "group closed"
        );
    }

    fn close(&mut self, line: &str) -> Result<(), FrameError> {
        let mut trailer = decode_or_fallback(self.lookup.as_ref(), TRL, line);
        let mut found: Vec<StructuralError> = Vec::new();
        found.extend(reconcile(&mut trailer, TRL, Counter::Groups, self.group_count));
        found.extend(reconcile(&mut trailer, TRL, Counter::Transactions, self.transaction_count));
        found.extend(reconcile(&mut trailer, TRL, Counter::Records, self.record_count));
        self.valid &= trailer.is_valid();
        self.trailer = Some(trailer);
        self.state = FileState::Finished;
        if self.cursor.peek()?.is_some() {
            found.push(StructuralError::ContentAfterTrailer {
                line: self.cursor.line_number(),
            });
        }
        for error in found {
            tracing::warn!(%error, "file invalid");
            self.valid = false;
            self.errors.push(error);
        }
        tracing::debug!(
            groups = self.group_count,
            transactions = self.transaction_count,
            records = self.record_count,
            valid = self.valid,
            "file trailer reconciled"
        );
        Ok(())
    }
}

/// Lazy view of one group's transactions.
///
/// Borrows the file, so only one group can be open at a time. Dropping the cursor early is
/// fine: the next [`EdiFile::next_group`] call drains what is left.
#[derive(Debug)]
pub struct GroupCursor<'a, R> {
    file: &'a mut EdiFile<R>,
    index: usize,
    done: bool,
}

impl<'a, R: BufRead> GroupCursor<'a, R> {
    pub fn group(&self) -> &Group {
        &self.file.groups[self.index]
    }

    pub fn type_code(&self) -> &str {
        self.group().type_code()
    }

    pub fn sequence(&self) -> u64 {
        self.group().sequence()
    }

    pub fn header(&self) -> &Record {
        self.group().header()
    }

    pub fn is_valid(&self) -> bool {
        self.group().is_valid()
    }

    /// Next transaction, or `Ok(None)` once the group trailer has been read and checked.
    /// Calling again after that is an error: a group's transactions can be read only once.
    pub fn next_transaction(&mut self) -> Result<Option<Transaction>, FrameError> {
        self.file.read_transaction(self.index)
    }

    /// Drain the remaining transactions and return the completed group.
    pub fn finish(self) -> Result<&'a Group, FrameError> {
        let file = self.file;
        if file.groups[self.index].state == GroupState::Open {
            file.drain(self.index)?;
        }
        Ok(&file.groups[self.index])
    }
}

impl<R: BufRead> Iterator for GroupCursor<'_, R> {
    type Item = Result<Transaction, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        // the `None` that ends the group is not sticky, so iterating again reports
        // `GroupDrained`; any error ends the iterator
        let result = self.next_transaction();
        if result.is_err() {
            self.done = true;
        }
        result.transpose()
    }
}

/// A group together with its transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGroup {
    pub group: Group,
    pub transactions: Vec<Transaction>,
}

impl DecodedGroup {
    /// Group header, transactions, and trailer, one line each.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.group.header.encode()];
        for transaction in &self.transactions {
            lines.extend(transaction.lines());
        }
        lines.extend(self.group.trailer.iter().map(Record::encode));
        lines
    }
}

/// A fully read file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFile {
    pub header: Option<Record>,
    pub trailer: Option<Record>,
    pub groups: Vec<DecodedGroup>,
    pub valid: bool,
    pub errors: Vec<StructuralError>,
}

impl DecodedFile {
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.groups.iter().flat_map(|g| g.transactions.iter())
    }

    /// Every line re-encoded, each terminated by `\n`.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        let trailer = self.trailer.iter().map(Record::encode);
        let lines = self
            .header
            .iter()
            .map(Record::encode)
            .chain(self.groups.iter().flat_map(DecodedGroup::lines))
            .chain(trailer);
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

fn type_prefix(line: &str) -> String {
    line.chars().take(TYPE_CODE_WIDTH).collect()
}

fn decode_or_fallback(lookup: &dyn SchemaLookup, code: &str, line: &str) -> Record {
    match Record::decode(lookup.schema_or_default(code), line, None) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(marker = code, error = %e, "marker record replaced by fallback");
            Record::opaque(line, None, e.to_issue())
        }
    }
}

fn check_group_code(record: &mut Record, marker: &'static str, expected: u64) -> Option<StructuralError> {
    if !record.has_field(GROUP_CODE) {
        return None;
    }
    let found = record.number(GROUP_CODE);
    if found == Some(expected) {
        return None;
    }
    let error = StructuralError::GroupCode { marker, found, expected };
    let _ = record.attach(Some(GROUP_CODE), error.to_issue());
    Some(error)
}

fn reconcile(record: &mut Record, marker: &'static str, counter: Counter, counted: u64) -> Option<StructuralError> {
    let field = counter.field_name();
    if !record.has_field(field) {
        return None;
    }
    let declared = record.number(field);
    if declared == Some(counted) {
        return None;
    }
    let error = StructuralError::CountMismatch {
        marker,
        counter,
        declared,
        counted,
    };
    let _ = record.attach(Some(field), error.to_issue());
    Some(error)
}
