//! Record schemas: ordered, named, fixed-width field specifications.
//!
//! A schema is built once and shared read-only (behind an `Arc`) by every record of that type.
//! Derived schemas start from a copy of the parent's field order; appending a new name adds a
//! field at the end, redeclaring an existing name replaces that field in its original position.

use crate::error::SchemaError;
use std::collections::HashMap;
use std::sync::Arc;

/// Width of the record type code at the start of every line.
pub const TYPE_CODE_WIDTH: usize = 3;

/// Widest numeric column whose every value fits a [`Value::Number`](crate::Value).
pub const MAX_NUMERIC_WIDTH: usize = 19;

/// File header marker.
pub const HDR: &str = "HDR";
/// File trailer marker.
pub const TRL: &str = "TRL";
/// Group header marker.
pub const GRH: &str = "GRH";
/// Group trailer marker.
pub const GRT: &str = "GRT";

/// True for the four reserved structural codes.
pub fn is_marker(code: &str) -> bool {
    matches!(code, HDR | TRL | GRH | GRT)
}

/// Value-encoding discipline of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Left-justified, space-padded.
    Text,
    /// Right-justified, zero-padded, non-negative.
    Numeric,
    /// Fixed preset value.
    Constant(String),
    /// Code looked up in a `(code, label)` table.
    Enumerated(Vec<(String, String)>),
    /// `Y` / `N` / `U` (unknown), one character.
    Flag,
    /// `Y` / `N`, one character.
    Boolean,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Numeric => "numeric",
            FieldKind::Constant(_) => "constant",
            FieldKind::Enumerated(_) => "enum",
            FieldKind::Flag => "flag",
            FieldKind::Boolean => "boolean",
        }
    }
}

/// One fixed-width column of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub width: usize,
    pub mandatory: bool,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, width: usize, kind: FieldKind) -> Self {
        FieldSpec {
            name: name.into(),
            width,
            mandatory: false,
            kind,
        }
    }

    pub fn text(name: impl Into<String>, width: usize) -> Self {
        FieldSpec::new(name, width, FieldKind::Text)
    }

    pub fn numeric(name: impl Into<String>, width: usize) -> Self {
        FieldSpec::new(name, width, FieldKind::Numeric)
    }

    /// Constant field. Without a preset the constant is all spaces (a filler).
    pub fn constant(name: impl Into<String>, width: usize, preset: Option<&str>) -> Self {
        let preset = match preset {
            Some(p) => p.to_string(),
            None => " ".repeat(width),
        };
        FieldSpec::new(name, width, FieldKind::Constant(preset))
    }

    pub fn enumerated<C, L>(name: impl Into<String>, width: usize, choices: impl IntoIterator<Item = (C, L)>) -> Self
    where
        C: Into<String>,
        L: Into<String>,
    {
        let choices = choices.into_iter().map(|(c, l)| (c.into(), l.into())).collect();
        FieldSpec::new(name, width, FieldKind::Enumerated(choices))
    }

    pub fn flag(name: impl Into<String>) -> Self {
        FieldSpec::new(name, 1, FieldKind::Flag)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        FieldSpec::new(name, 1, FieldKind::Boolean)
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Check the width invariants of this spec.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.width == 0 {
            return Err(SchemaError::ZeroWidth {
                field: self.name.clone(),
            });
        }
        match &self.kind {
            FieldKind::Constant(preset) => {
                if preset.chars().count() != self.width {
                    return Err(SchemaError::ConstantWidth {
                        field: self.name.clone(),
                        value: preset.clone(),
                        width: self.width,
                    });
                }
            }
            FieldKind::Enumerated(choices) => {
                for (code, _) in choices {
                    let len = code.chars().count();
                    if len == 0 || len > self.width || code.trim() != code {
                        return Err(SchemaError::CodeWidth {
                            field: self.name.clone(),
                            code: code.clone(),
                            width: self.width,
                        });
                    }
                }
            }
            FieldKind::Flag | FieldKind::Boolean => {
                if self.width != 1 {
                    return Err(SchemaError::SingleCharacter {
                        field: self.name.clone(),
                        kind: self.kind.name(),
                    });
                }
            }
            FieldKind::Numeric => {
                if self.width > MAX_NUMERIC_WIDTH {
                    return Err(SchemaError::NumericWidth {
                        field: self.name.clone(),
                        width: self.width,
                        max: MAX_NUMERIC_WIDTH,
                    });
                }
            }
            FieldKind::Text => {}
        }
        Ok(())
    }
}

/// Ordered sequence of field specs with unique names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
    width: usize,
}

impl RecordSchema {
    /// Start a schema with no parent.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Start a schema that extends `self`.
    pub fn extend(&self, name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: self.fields.clone(),
        }
    }

    /// Schema with no fields: the whole line is kept as tail.
    pub fn opaque() -> Self {
        RecordSchema {
            name: "opaque".to_string(),
            fields: Vec::new(),
            index: HashMap::new(),
            width: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total declared width of all fields.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.position(name).map(|i| &self.fields[i])
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// `[start, end)` character span of each field, in order.
    pub fn spans(&self) -> impl Iterator<Item = (usize, usize, &FieldSpec)> {
        self.fields.iter().scan(0usize, |pos, f| {
            let start = *pos;
            *pos += f.width;
            Some((start, *pos, f))
        })
    }
}

/// Accumulates fields for a [`RecordSchema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    /// Append a field, or replace the field of the same name in place.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.push(spec);
        self
    }

    pub fn push(&mut self, spec: FieldSpec) {
        match self.fields.iter_mut().find(|f| f.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.fields.push(spec),
        }
    }

    pub fn build(self) -> Result<RecordSchema, SchemaError> {
        let mut index = HashMap::with_capacity(self.fields.len());
        let mut width = 0;
        for (i, f) in self.fields.iter().enumerate() {
            f.validate()?;
            index.insert(f.name.clone(), i);
            width += f.width;
        }
        Ok(RecordSchema {
            name: self.name,
            fields: self.fields,
            index,
            width,
        })
    }
}

/// Built-in schemas: the record base, the transaction record base, and the four markers.
pub mod builtin {
    use super::*;
    use std::sync::OnceLock;

    fn shared(cell: &'static OnceLock<Arc<RecordSchema>>, make: fn() -> RecordSchema) -> Arc<RecordSchema> {
        cell.get_or_init(|| Arc::new(make())).clone()
    }

    fn make_record() -> RecordSchema {
        RecordSchema {
            name: "record".to_string(),
            fields: vec![FieldSpec::text("record_type", TYPE_CODE_WIDTH).mandatory()],
            index: HashMap::from([("record_type".to_string(), 0)]),
            width: TYPE_CODE_WIDTH,
        }
    }

    fn extend_record(name: &str, marker: Option<&str>, extra: Vec<FieldSpec>) -> RecordSchema {
        let mut b = make_record().extend(name);
        if let Some(code) = marker {
            b.push(FieldSpec::constant("record_type", TYPE_CODE_WIDTH, Some(code)).mandatory());
        }
        for f in extra {
            b.push(f);
        }
        // built-in specs always satisfy the width rules
        match b.build() {
            Ok(s) => s,
            Err(_) => make_record(),
        }
    }

    fn make_transaction() -> RecordSchema {
        extend_record(
            "transaction",
            None,
            vec![
                FieldSpec::numeric("transaction_sequence_number", 8),
                FieldSpec::numeric("record_sequence_number", 8),
            ],
        )
    }

    fn make_hdr() -> RecordSchema {
        extend_record(HDR, None, Vec::new())
    }

    fn make_trl() -> RecordSchema {
        extend_record(
            TRL,
            Some(TRL),
            vec![
                FieldSpec::numeric("group_count", 5).mandatory(),
                FieldSpec::numeric("transaction_count", 8).mandatory(),
                FieldSpec::numeric("record_count", 8).mandatory(),
            ],
        )
    }

    fn make_grh() -> RecordSchema {
        extend_record(
            GRH,
            Some(GRH),
            vec![
                FieldSpec::text("transaction_type", 3).mandatory(),
                FieldSpec::numeric("group_code", 5).mandatory(),
            ],
        )
    }

    fn make_grt() -> RecordSchema {
        extend_record(
            GRT,
            Some(GRT),
            vec![
                FieldSpec::numeric("group_code", 5).mandatory(),
                FieldSpec::numeric("transaction_count", 8).mandatory(),
                FieldSpec::numeric("record_count", 8).mandatory(),
            ],
        )
    }

    /// Only `record_type`.
    pub fn record() -> Arc<RecordSchema> {
        static CELL: OnceLock<Arc<RecordSchema>> = OnceLock::new();
        shared(&CELL, make_record)
    }

    /// `record_type`, `transaction_sequence_number`, `record_sequence_number`.
    pub fn transaction() -> Arc<RecordSchema> {
        static CELL: OnceLock<Arc<RecordSchema>> = OnceLock::new();
        shared(&CELL, make_transaction)
    }

    pub fn hdr() -> Arc<RecordSchema> {
        static CELL: OnceLock<Arc<RecordSchema>> = OnceLock::new();
        shared(&CELL, make_hdr)
    }

    pub fn trl() -> Arc<RecordSchema> {
        static CELL: OnceLock<Arc<RecordSchema>> = OnceLock::new();
        shared(&CELL, make_trl)
    }

    pub fn grh() -> Arc<RecordSchema> {
        static CELL: OnceLock<Arc<RecordSchema>> = OnceLock::new();
        shared(&CELL, make_grh)
    }

    pub fn grt() -> Arc<RecordSchema> {
        static CELL: OnceLock<Arc<RecordSchema>> = OnceLock::new();
        shared(&CELL, make_grt)
    }

    pub fn opaque() -> Arc<RecordSchema> {
        static CELL: OnceLock<Arc<RecordSchema>> = OnceLock::new();
        shared(&CELL, RecordSchema::opaque)
    }

    /// Built-in schema of a structural marker code.
    pub fn marker(code: &str) -> Option<Arc<RecordSchema>> {
        match code {
            HDR => Some(hdr()),
            TRL => Some(trl()),
            GRH => Some(grh()),
            GRT => Some(grt()),
            _ => None,
        }
    }

    /// Look up a built-in by the name used in `extends` clauses.
    pub fn by_name(name: &str) -> Option<Arc<RecordSchema>> {
        match name {
            "record" => Some(record()),
            "transaction" => Some(transaction()),
            other => marker(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_keeps_position() {
        let base = RecordSchema::builder("base")
            .field(FieldSpec::text("a", 3))
            .field(FieldSpec::numeric("b", 4))
            .build()
            .unwrap();
        let child = base
            .extend("child")
            .field(FieldSpec::text("c", 2))
            .field(FieldSpec::constant("a", 3, Some("XYZ")))
            .build()
            .unwrap();
        let names: Vec<&str> = child.labels().collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(child.width(), 9);
        assert!(matches!(child.fields()[0].kind, FieldKind::Constant(_)));
        // parent untouched
        assert_eq!(base.fields()[0].kind, FieldKind::Text);
    }

    #[test]
    fn constant_preset_must_fit() {
        let err = RecordSchema::builder("bad")
            .field(FieldSpec::constant("c", 5, Some("123")))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::ConstantWidth { .. }));
    }

    #[test]
    fn builtin_marker_widths() {
        assert_eq!(builtin::grh().width(), 11);
        assert_eq!(builtin::grt().width(), 24);
        assert_eq!(builtin::trl().width(), 24);
        assert_eq!(builtin::transaction().width(), 19);
    }
}
