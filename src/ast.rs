//! Abstract Syntax Tree for the record-layout DSL.

/// Root of a DSL source: record declarations in source order.
#[derive(Debug, Clone, Default)]
pub struct SchemaFile {
    pub records: Vec<RecordDef>,
}

/// `record NAME [extends BASE] { ... }`
#[derive(Debug, Clone)]
pub struct RecordDef {
    pub name: String,
    pub extends: Option<String>,
    pub fields: Vec<FieldDef>,
}

/// `name: kind [mandatory];`
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: KindDef,
    pub mandatory: bool,
}

/// Field kind as written in the DSL, widths not yet checked.
#[derive(Debug, Clone, PartialEq)]
pub enum KindDef {
    Text(u64),
    Numeric(u64),
    Constant(u64, Option<String>),
    Enum(u64, Vec<(String, String)>),
    Flag,
    Boolean,
}

impl KindDef {
    pub fn width(&self) -> u64 {
        match self {
            KindDef::Text(w) | KindDef::Numeric(w) | KindDef::Constant(w, _) | KindDef::Enum(w, _) => *w,
            KindDef::Flag | KindDef::Boolean => 1,
        }
    }
}
