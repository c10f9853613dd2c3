//! Mapping from record type codes to schemas.
//!
//! The concrete record catalogue of an EDI format lives outside this crate and is reached through
//! [`SchemaLookup`]. [`Registry`] is the stock implementation: a code → schema map filled in code
//! or from the layout DSL.

use crate::ast::{FieldDef, KindDef, SchemaFile};
use crate::error::SchemaError;
use crate::parser::parse;
use crate::schema::{builtin, FieldKind, FieldSpec, RecordSchema};
use crate::transaction::Transaction;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Resolves the schema for a line's three-character prefix.
pub trait SchemaLookup: Send + Sync + fmt::Debug {
    /// Schema registered for `type_code`, if any.
    fn record_schema(&self, type_code: &str) -> Option<Arc<RecordSchema>>;

    /// Registered schema, else the built-in marker schema, else the minimal transaction record.
    fn schema_or_default(&self, type_code: &str) -> Arc<RecordSchema> {
        self.record_schema(type_code)
            .or_else(|| builtin::marker(type_code))
            .unwrap_or_else(builtin::transaction)
    }

    /// Format-specific checks on a decoded transaction, such as which record types may follow
    /// which. Report findings with [`Transaction::invalidate`].
    fn validate_transaction(&self, _transaction: &mut Transaction) {}
}

/// Code → schema map. Named schemas that are not type codes are kept for `extends`.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    by_code: HashMap<String, Arc<RecordSchema>>,
    by_name: HashMap<String, Arc<RecordSchema>>,
}

impl Registry {
    /// Built-ins only.
    pub fn standard() -> Self {
        Registry::default()
    }

    /// Parse and resolve DSL source.
    pub fn from_dsl(source: &str) -> Result<Self, SchemaError> {
        let mut registry = Registry::standard();
        registry.load(parse(source)?)?;
        Ok(registry)
    }

    /// Resolve a parsed DSL file into a new registry.
    pub fn resolve(file: SchemaFile) -> Result<Self, SchemaError> {
        let mut registry = Registry::standard();
        registry.load(file)?;
        Ok(registry)
    }

    /// Add the records of a parsed DSL file. Later records may extend earlier ones.
    pub fn load(&mut self, file: SchemaFile) -> Result<(), SchemaError> {
        for def in file.records {
            if self.by_name.contains_key(&def.name) {
                return Err(SchemaError::DuplicateRecord(def.name));
            }
            let base = match &def.extends {
                Some(name) => self
                    .by_name
                    .get(name)
                    .cloned()
                    .or_else(|| builtin::by_name(name))
                    .ok_or_else(|| SchemaError::UnknownBase(name.clone()))?,
                None => builtin::record(),
            };
            let mut builder = base.extend(def.name.clone());
            for field in &def.fields {
                builder.push(field_spec(field)?);
            }
            let schema = Arc::new(builder.build()?);
            tracing::debug!(record = %def.name, fields = schema.len(), width = schema.width(), "schema resolved");
            if def.name.chars().count() == 3 {
                self.by_code.insert(def.name.clone(), schema.clone());
            }
            self.by_name.insert(def.name, schema);
        }
        Ok(())
    }

    /// Register `schema` under `code`, replacing any previous entry.
    pub fn insert(&mut self, code: impl Into<String>, schema: Arc<RecordSchema>) -> Option<Arc<RecordSchema>> {
        let code = code.into();
        self.by_name.insert(code.clone(), schema.clone());
        self.by_code.insert(code, schema)
    }

    pub fn with(mut self, code: impl Into<String>, schema: RecordSchema) -> Self {
        self.insert(code, Arc::new(schema));
        self
    }

    /// Schema by declared name (type code or helper name).
    pub fn get(&self, name: &str) -> Option<&Arc<RecordSchema>> {
        self.by_name.get(name)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.by_code.keys().map(String::as_str)
    }

    pub fn into_shared(self) -> Arc<dyn SchemaLookup> {
        Arc::new(self)
    }
}

impl SchemaLookup for Registry {
    fn record_schema(&self, type_code: &str) -> Option<Arc<RecordSchema>> {
        self.by_code.get(type_code).cloned()
    }
}

fn width(field: &FieldDef) -> Result<usize, SchemaError> {
    usize::try_from(field.kind.width()).map_err(|_| SchemaError::Parse(format!("width of {} too large", field.name)))
}

fn field_spec(field: &FieldDef) -> Result<FieldSpec, SchemaError> {
    let w = width(field)?;
    let kind = match &field.kind {
        KindDef::Text(_) => FieldKind::Text,
        KindDef::Numeric(_) => FieldKind::Numeric,
        KindDef::Constant(_, Some(preset)) => FieldKind::Constant(preset.clone()),
        KindDef::Constant(_, None) => FieldKind::Constant(" ".repeat(w)),
        KindDef::Enum(_, choices) => FieldKind::Enumerated(choices.clone()),
        KindDef::Flag => FieldKind::Flag,
        KindDef::Boolean => FieldKind::Boolean,
    };
    let spec = FieldSpec {
        name: field.name.clone(),
        width: w,
        mandatory: field.mandatory,
        kind,
    };
    spec.validate()?;
    Ok(spec)
}
