//! One decoded (or hand-built) line: typed field values, an opaque tail, and per-field status.

use crate::codec::worse;
use crate::error::{Issue, RecordError, SchemaError, Severity, Status};
use crate::schema::{builtin, FieldKind, FieldSpec, RecordSchema, TYPE_CODE_WIDTH};
use crate::value::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    type_code: Option<String>,
    sequence: Option<usize>,
    values: Vec<Option<Value>>,
    issues: Vec<Option<Issue>>,
    record_issue: Option<Issue>,
    tail: String,
}

/// Read-only view of one field, for rendering layers.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    pub spec: &'a FieldSpec,
    pub value: Option<&'a Value>,
    pub issue: Option<&'a Issue>,
}

impl FieldView<'_> {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn encoded(&self) -> String {
        self.spec.encode(self.value)
    }

    pub fn is_valid(&self) -> bool {
        self.issue.map_or(true, |i| !i.severity.is_error())
    }

    pub fn status(&self) -> Option<Status> {
        self.issue.map(Issue::status)
    }

    pub fn verbose_label(&self) -> Option<String> {
        self.spec.verbose_label(self.value)
    }
}

impl Record {
    /// Empty record for building output. All values absent, no type code.
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        let n = schema.len();
        Record {
            schema,
            type_code: None,
            sequence: None,
            values: vec![None; n],
            issues: vec![None; n],
            record_issue: None,
            tail: String::new(),
        }
    }

    /// Decode a line against `schema`.
    ///
    /// Short lines are padded with spaces, never truncated. Missing and truncated fields are
    /// reported on the field; only a line of three characters or fewer, or non-numeric text
    /// in a numeric field, fails the record.
    pub fn decode(schema: Arc<RecordSchema>, line: &str, sequence: Option<usize>) -> Result<Record, RecordError> {
        let chars: Vec<char> = line.chars().collect();
        let actual = chars.len();
        if actual <= TYPE_CODE_WIDTH {
            return Err(RecordError::TooShort {
                line: line.to_string(),
            });
        }
        let mut record = Record::new(schema.clone());
        record.type_code = Some(chars[..TYPE_CODE_WIDTH].iter().collect());
        record.sequence = sequence;

        for (i, (start, end, spec)) in schema.spans().enumerate() {
            if start < actual && actual < end {
                record.put_issue(i, Issue::warning("field truncated"));
            } else if end > actual {
                if spec.mandatory {
                    record.put_issue(i, Issue::field_error("mandatory field missing"));
                } else {
                    record.put_issue(i, Issue::warning("field missing at the end of the line"));
                }
            }
            let slice: String = (start..end).map(|p| chars.get(p).copied().unwrap_or(' ')).collect();
            match spec.decode(&slice) {
                Ok(d) => {
                    record.values[i] = d.value;
                    if let Some(issue) = d.issue {
                        record.put_issue(i, issue);
                    }
                }
                Err(e) => {
                    record.put_issue(i, e.to_issue());
                    tracing::trace!(field = %spec.name, error = %e, "record decode aborted");
                    return Err(e);
                }
            }
        }
        if actual > schema.width() {
            record.tail = chars[schema.width()..].iter().collect();
        }
        Ok(record)
    }

    /// Fallback for a line that could not be decoded: no fields, the whole line kept as tail.
    pub fn opaque(line: &str, sequence: Option<usize>, issue: Issue) -> Record {
        let mut record = Record::new(builtin::opaque());
        let code: String = line.chars().take(TYPE_CODE_WIDTH).collect();
        if code.chars().count() == TYPE_CODE_WIDTH {
            record.type_code = Some(code);
        }
        record.sequence = sequence;
        record.tail = line.to_string();
        record.record_issue = Some(issue);
        record
    }

    /// Concatenate every field's encoding, then the tail. Always succeeds.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.schema.width() + self.tail.len());
        for (spec, value) in self.schema.fields().iter().zip(&self.values) {
            out.push_str(&spec.encode(value.as_ref()));
        }
        out.push_str(&self.tail);
        out
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Type code from the decoded line, or from the first field of a hand-built record.
    pub fn type_code(&self) -> Option<&str> {
        if let Some(code) = &self.type_code {
            return Some(code.as_str());
        }
        let first = self.schema.fields().first()?;
        if first.width != TYPE_CODE_WIDTH {
            return None;
        }
        match (&first.kind, self.values.first().and_then(Option::as_ref)) {
            (_, Some(Value::Text(s))) => Some(s.as_str()),
            (FieldKind::Constant(preset), None) if !preset.trim().is_empty() => Some(preset.as_str()),
            _ => None,
        }
    }

    pub fn sequence(&self) -> Option<usize> {
        self.sequence
    }

    pub fn set_sequence(&mut self, sequence: Option<usize>) {
        self.sequence = sequence;
    }

    pub fn tail(&self) -> &str {
        &self.tail
    }

    pub fn set_tail(&mut self, tail: impl Into<String>) {
        self.tail = tail.into();
    }

    /// Valid unless some attached condition is an error.
    pub fn is_valid(&self) -> bool {
        self.record_issue.iter().chain(self.issues.iter().flatten()).all(|i| !i.severity.is_error())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.position(name).and_then(|i| self.values[i].as_ref())
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn number(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.schema.position(name).is_some()
    }

    fn position(&self, name: &str) -> Result<usize, SchemaError> {
        self.schema.position(name).ok_or_else(|| SchemaError::UnknownField {
            schema: self.schema.name().to_string(),
            field: name.to_string(),
        })
    }

    /// Assign a typed value. The field's status is replaced by the result of checking it.
    pub fn set_value(&mut self, name: &str, value: Option<Value>) -> Result<(), SchemaError> {
        let i = self.position(name)?;
        self.issues[i] = self.schema.fields()[i].check(value.as_ref());
        self.values[i] = value;
        Ok(())
    }

    /// Assign from text, running the field's decode. Non-numeric text in a numeric field is
    /// recorded as a record error on the field and leaves the value absent.
    pub fn set_raw(&mut self, name: &str, raw: &str) -> Result<(), SchemaError> {
        let i = self.position(name)?;
        let spec = &self.schema.fields()[i];
        let padded: String = format!("{:<width$}", raw, width = spec.width);
        match spec.decode(&padded) {
            Ok(d) => {
                self.values[i] = d.value;
                self.issues[i] = d.issue;
            }
            Err(e) => {
                self.values[i] = None;
                self.issues[i] = Some(e.to_issue());
            }
        }
        Ok(())
    }

    fn put_issue(&mut self, i: usize, issue: Issue) {
        self.issues[i] = worse(self.issues[i].take(), Some(issue));
    }

    /// Attach a condition to a field, or to the record when `field` is `None`.
    /// A less severe condition never replaces a more severe one.
    pub fn attach(&mut self, field: Option<&str>, issue: Issue) -> Result<(), SchemaError> {
        match field {
            Some(name) => {
                let i = self.position(name)?;
                self.put_issue(i, issue);
            }
            None => self.record_issue = worse(self.record_issue.take(), Some(issue)),
        }
        Ok(())
    }

    pub fn attach_warning(&mut self, field: Option<&str>, message: impl Into<String>) -> Result<(), SchemaError> {
        self.attach(field, Issue::warning(message))
    }

    /// Attach a field error; the record becomes invalid.
    pub fn attach_error(&mut self, field: Option<&str>, message: impl Into<String>) -> Result<(), SchemaError> {
        self.attach(field, Issue::field_error(message))
    }

    pub fn issue(&self, field: &str) -> Option<&Issue> {
        self.schema.position(field).and_then(|i| self.issues[i].as_ref())
    }

    pub fn record_issue(&self) -> Option<&Issue> {
        self.record_issue.as_ref()
    }

    pub fn field_status(&self, field: &str) -> Option<Status> {
        self.issue(field).map(Issue::status)
    }

    /// Every attached condition: `(None, _)` for the record-level one, then fields in order.
    pub fn issues(&self) -> impl Iterator<Item = (Option<&str>, &Issue)> {
        let record = self.record_issue.iter().map(|i| (None, i));
        let fields = self
            .schema
            .fields()
            .iter()
            .zip(&self.issues)
            .filter_map(|(spec, issue)| issue.as_ref().map(|i| (Some(spec.name.as_str()), i)));
        record.chain(fields)
    }

    /// Highest severity attached anywhere in the record.
    pub fn worst(&self) -> Option<Severity> {
        self.issues().map(|(_, i)| i.severity).max()
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldView<'_>> {
        self.schema
            .fields()
            .iter()
            .zip(self.values.iter().zip(&self.issues))
            .map(|(spec, (value, issue))| FieldView {
                spec,
                value: value.as_ref(),
                issue: issue.as_ref(),
            })
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}
