//! Plain-text diagnostics for decoded entities.
//!
//! Conditions attached to record fields are reported where they sit; structural errors that
//! never reach a field (missing markers, content after the trailer) are reported on their own.

use crate::error::{Severity, StructuralError};
use crate::frame::Group;
use crate::record::Record;
use crate::transaction::Transaction;
use std::fmt;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportStyle {
    /// One line per diagnostic: `path: location: severity: field: message`.
    #[default]
    Compact,
    /// Indented, two lines per diagnostic.
    Human,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: String,
    pub field: Option<String>,
    pub severity: Severity,
    pub message: String,
}

fn severity_id(severity: Severity) -> &'static str {
    match severity {
        Severity::Warning => "warning",
        Severity::FieldError => "field-error",
        Severity::RecordError => "record-error",
        Severity::FileError => "file-error",
    }
}

impl Diagnostic {
    pub fn render(&self, path: &str, style: ReportStyle) -> String {
        let field = self.field.as_deref().unwrap_or("-");
        match style {
            ReportStyle::Compact => format!(
                "{}: {}: {}: {}: {}",
                path,
                self.location,
                severity_id(self.severity),
                field,
                self.message
            ),
            ReportStyle::Human => format!(
                "  {} {}\n    {} in {}: {}",
                path,
                self.location,
                severity_id(self.severity),
                field,
                self.message
            ),
        }
    }
}

/// True for errors that are also attached to a field of a marker or transaction record.
fn attached_to_field(error: &StructuralError) -> bool {
    matches!(
        error,
        StructuralError::TransactionSequence { .. }
            | StructuralError::RecordSequence { .. }
            | StructuralError::GroupCode { .. }
            | StructuralError::CountMismatch { .. }
    )
}

/// Diagnostics collected while walking a file.
#[derive(Debug, Default)]
pub struct Report {
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new() -> Self {
        Report::default()
    }

    /// Every condition attached to `record`.
    pub fn record(&mut self, location: impl fmt::Display, record: &Record) {
        let location = location.to_string();
        for (field, issue) in record.issues() {
            self.diagnostics.push(Diagnostic {
                location: location.clone(),
                field: field.map(str::to_string),
                severity: issue.severity,
                message: issue.message.clone(),
            });
        }
    }

    pub fn transaction(&mut self, group: u64, transaction: &Transaction) {
        for (i, record) in transaction.records().iter().enumerate() {
            self.record(format_args!("group {} {} record {}", group, transaction, i), record);
        }
        self.structural(format_args!("group {} {}", group, transaction), transaction.errors());
    }

    pub fn group_header(&mut self, group: &Group) {
        self.record(format_args!("group {} GRH", group.sequence()), group.header());
    }

    /// No-op until the group has been drained.
    pub fn group_trailer(&mut self, group: &Group) {
        if let Some(trailer) = group.trailer() {
            self.record(format_args!("group {} GRT", group.sequence()), trailer);
        }
    }

    /// Structural errors not already visible on a field.
    pub fn structural(&mut self, location: impl fmt::Display, errors: &[StructuralError]) {
        let location = location.to_string();
        for error in errors.iter().filter(|e| !attached_to_field(e)) {
            self.diagnostics.push(Diagnostic {
                location: location.clone(),
                field: None,
                severity: Severity::FileError,
                message: error.to_string(),
            });
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }

    pub fn write(&self, out: &mut impl Write, path: &str, style: ReportStyle) -> io::Result<()> {
        for d in &self.diagnostics {
            writeln!(out, "{}", d.render(path, style))?;
        }
        Ok(())
    }
}
