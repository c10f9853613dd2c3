//! Error and status types, from field warnings up to hard framing failures.

use std::fmt;

/// Blast radius of a condition, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Non-conforming but recoverable field content. Never invalidates.
    Warning,
    /// Field value fails its own kind's constraint. Invalidates the record.
    FieldError,
    /// Field content cannot be parsed for its kind, or the line is too short.
    RecordError,
    /// Framing violation: sequence numbers, counts, markers.
    FileError,
}

impl Severity {
    pub fn is_error(self) -> bool {
        self >= Severity::FieldError
    }

    pub fn status(self) -> Status {
        if self.is_error() {
            Status::Error
        } else {
            Status::Warning
        }
    }
}

/// Two-level projection of [`Severity`] for display layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Warning,
    Error,
}

/// A condition attached to a field (or to a record as a whole).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Issue {
            severity,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Issue::new(Severity::Warning, message)
    }

    pub fn field_error(message: impl Into<String>) -> Self {
        Issue::new(Severity::FieldError, message)
    }

    pub fn record_error(message: impl Into<String>) -> Self {
        Issue::new(Severity::RecordError, message)
    }

    pub fn file_error(message: impl Into<String>) -> Self {
        Issue::new(Severity::FileError, message)
    }

    pub fn status(&self) -> Status {
        self.severity.status()
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Fatal-for-record condition: decoding of the line stops.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record too short: {line:?}")]
    TooShort { line: String },
    #[error("value {value:?} in field {field} is not numeric")]
    NotNumeric { field: String, value: String },
}

impl RecordError {
    pub fn to_issue(&self) -> Issue {
        Issue::record_error(self.to_string())
    }
}

/// Counter reconciled between a trailer and the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Groups,
    Transactions,
    Records,
}

impl Counter {
    /// Name of the trailer field carrying this counter.
    pub fn field_name(self) -> &'static str {
        match self {
            Counter::Groups => "group_count",
            Counter::Transactions => "transaction_count",
            Counter::Records => "record_count",
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Counter::Groups => f.write_str("group count"),
            Counter::Transactions => f.write_str("transaction count"),
            Counter::Records => f.write_str("record count"),
        }
    }
}

fn show(n: &Option<u64>) -> String {
    match n {
        Some(n) => n.to_string(),
        None => "(blank)".to_string(),
    }
}

/// Framing violation. Recorded in the `errors` list of the level that found it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("wrong transaction sequence {}, should be {expected} (record {record})", show(.found))]
    TransactionSequence {
        record: usize,
        found: Option<u64>,
        expected: u64,
    },
    #[error("wrong record sequence {}, should be {expected} (record {record})", show(.found))]
    RecordSequence {
        record: usize,
        found: Option<u64>,
        expected: u64,
    },
    #[error("wrong group code in {marker}: {}, should be {expected}", show(.found))]
    GroupCode {
        marker: &'static str,
        found: Option<u64>,
        expected: u64,
    },
    #[error("wrong {counter} in {marker}: {}, counted {counted}", show(.declared))]
    CountMismatch {
        marker: &'static str,
        counter: Counter,
        declared: Option<u64>,
        counted: u64,
    },
    #[error("record {record} out of order: {message}")]
    RecordOrder { record: usize, message: String },
    #[error("file header missing, found {found:?} on line {line}")]
    HeaderMissing { line: usize, found: String },
    #[error("group header missing for group {group}, found {found:?} on line {line}")]
    GroupHeaderMissing {
        group: u64,
        line: usize,
        found: String,
    },
    #[error("group trailer missing for group {group}")]
    GroupTrailerMissing { group: u64, line: Option<usize> },
    #[error("file trailer missing")]
    TrailerMissing,
    #[error("content after file trailer on line {line}")]
    ContentAfterTrailer { line: usize },
}

impl StructuralError {
    pub fn to_issue(&self) -> Issue {
        Issue::file_error(self.to_string())
    }

    /// True for the conditions that end the parse.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StructuralError::GroupHeaderMissing { .. }
                | StructuralError::GroupTrailerMissing { .. }
                | StructuralError::TrailerMissing
        )
    }
}

/// Hard failure of a framing call.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error("transactions of group {group} were already consumed")]
    GroupDrained { group: u64 },
}

/// Schema definition failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("field {field}: width must be positive")]
    ZeroWidth { field: String },
    #[error("field {field}: value {value:?} is not {width} characters long")]
    ConstantWidth {
        field: String,
        value: String,
        width: usize,
    },
    #[error("field {field}: code {code:?} does not fit in {width} characters")]
    CodeWidth {
        field: String,
        code: String,
        width: usize,
    },
    #[error("field {field}: numeric width {width} is wider than {max} digits")]
    NumericWidth { field: String, width: usize, max: usize },
    #[error("field {field}: {kind} fields are 1 character wide")]
    SingleCharacter { field: String, kind: &'static str },
    #[error("no such field {field} in {schema}")]
    UnknownField { schema: String, field: String },
    #[error("unknown base schema: {0}")]
    UnknownBase(String),
    #[error("duplicate record name: {0}")]
    DuplicateRecord(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
