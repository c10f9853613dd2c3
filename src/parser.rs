//! Parse record-layout DSL source into AST using PEST.

use crate::ast::*;
use crate::error::SchemaError;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct SchemaParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

/// Parse DSL source into AST. Widths and base names are checked later, by
/// [`Registry::resolve`](crate::registry::Registry::resolve).
pub fn parse(source: &str) -> Result<SchemaFile, SchemaError> {
    let pairs = SchemaParser::parse(Rule::schema, source)
        .map_err(|e| SchemaError::Parse(e.to_string()))?;
    let pair = pairs.into_iter().next().ok_or_else(|| SchemaError::Parse("empty parse".to_string()))?;
    let mut records = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::record_def {
            records.push(build_record(inner)?);
        }
    }
    Ok(SchemaFile { records })
}

fn build_record(pair: Pair) -> Result<RecordDef, SchemaError> {
    let mut name = None;
    let mut extends = None;
    let mut fields = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = Some(inner.as_str().to_string()),
            Rule::extends => {
                let base = inner.into_inner().next().ok_or_else(|| missing("extends: name"))?;
                extends = Some(base.as_str().to_string());
            }
            Rule::field_def => fields.push(build_field(inner)?),
            _ => {}
        }
    }
    Ok(RecordDef {
        name: name.ok_or_else(|| missing("record: name"))?,
        extends,
        fields,
    })
}

fn build_field(pair: Pair) -> Result<FieldDef, SchemaError> {
    let mut name = None;
    let mut kind = None;
    let mut mandatory = false;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = Some(inner.as_str().to_string()),
            Rule::kind => kind = Some(build_kind(inner)?),
            Rule::mandatory => mandatory = true,
            _ => {}
        }
    }
    Ok(FieldDef {
        name: name.ok_or_else(|| missing("field: name"))?,
        kind: kind.ok_or_else(|| missing("field: kind"))?,
        mandatory,
    })
}

fn build_kind(pair: Pair) -> Result<KindDef, SchemaError> {
    let kind = pair.into_inner().next().ok_or_else(|| missing("kind"))?;
    let rule = kind.as_rule();
    let mut inner = kind.into_inner();
    match rule {
        Rule::text_kind => Ok(KindDef::Text(parse_number(inner.next())?)),
        Rule::numeric_kind => Ok(KindDef::Numeric(parse_number(inner.next())?)),
        Rule::constant_kind => {
            let width = parse_number(inner.next())?;
            let preset = inner.next().map(string_content);
            Ok(KindDef::Constant(width, preset))
        }
        Rule::enum_kind => {
            let width = parse_number(inner.next())?;
            let mut choices = Vec::new();
            for choice in inner {
                let mut parts = choice.into_inner();
                let code = parts.next().map(string_content).ok_or_else(|| missing("enum: code"))?;
                let label = parts.next().map(string_content).ok_or_else(|| missing("enum: label"))?;
                choices.push((code, label));
            }
            Ok(KindDef::Enum(width, choices))
        }
        Rule::flag_kind => Ok(KindDef::Flag),
        Rule::boolean_kind => Ok(KindDef::Boolean),
        other => Err(SchemaError::Parse(format!("unexpected rule {:?}", other))),
    }
}

fn parse_number(pair: Option<Pair>) -> Result<u64, SchemaError> {
    let pair = pair.ok_or_else(|| missing("width"))?;
    pair.as_str()
        .parse()
        .map_err(|_| SchemaError::Parse(format!("invalid width: {}", pair.as_str())))
}

fn string_content(pair: Pair) -> String {
    pair.into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

fn missing(what: &str) -> SchemaError {
    SchemaError::Parse(format!("missing {}", what))
}
