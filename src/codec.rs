//! Encode/decode one fixed-width column according to its [`FieldKind`].
//!
//! | kind | decode | encode |
//! |------|--------|--------|
//! | text | strip whitespace, empty is absent | left-justify, space-pad |
//! | numeric | non-negative integer, blank is absent | right-justify, zero-pad |
//! | constant | like text, warns when the slice differs from the preset | the preset |
//! | enum | like text, error when the code is not in the table | the code |
//! | flag | `Y` / `N` / `U` / space | `Y` / `N` / `U` (mandatory) or space |
//! | boolean | `Y` / `N` / space | `Y` / `N` / space |
//!
//! Decoding never fails for content problems a record can carry on with: those come back as an
//! [`Issue`] next to the value. Only non-numeric text in a numeric column is returned as
//! [`RecordError::NotNumeric`], which ends decoding of the record.

use crate::error::{Issue, RecordError};
use crate::schema::{FieldKind, FieldSpec};
use crate::value::Value;

const FLAG_CODES: &str = "\"Y\", \"N\", \"U\"";
const BOOLEAN_CODES: &str = "\"Y\", \"N\"";

/// Outcome of decoding one slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecode {
    pub value: Option<Value>,
    pub issue: Option<Issue>,
}

impl FieldDecode {
    fn ok(value: Option<Value>) -> Self {
        FieldDecode { value, issue: None }
    }

    fn with(value: Option<Value>, issue: Issue) -> Self {
        FieldDecode {
            value,
            issue: Some(issue),
        }
    }
}

/// Keep the more severe of two issues; on a tie the earlier one wins.
pub(crate) fn worse(current: Option<Issue>, new: Option<Issue>) -> Option<Issue> {
    match (current, new) {
        (Some(c), Some(n)) => {
            if n.severity > c.severity {
                Some(n)
            } else {
                Some(c)
            }
        }
        (c, n) => c.or(n),
    }
}

fn stripped(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn upper_bound(width: usize) -> Option<i128> {
    u32::try_from(width).ok().and_then(|w| 10i128.checked_pow(w))
}

fn mandatory_issue() -> Issue {
    Issue::field_error("value is mandatory")
}

fn one_of(choices: &[(String, String)]) -> String {
    let codes: Vec<String> = choices.iter().map(|(c, _)| format!("{:?}", c)).collect();
    codes.join(", ")
}

impl FieldSpec {
    /// Decode a slice of exactly `width` characters.
    pub fn decode(&self, raw: &str) -> Result<FieldDecode, RecordError> {
        let mut out = match &self.kind {
            FieldKind::Text => FieldDecode::ok(stripped(raw).map(Value::Text)),
            FieldKind::Numeric => self.decode_numeric(raw)?,
            FieldKind::Constant(preset) => {
                let value = stripped(raw).map(Value::Text);
                if raw != preset {
                    FieldDecode::with(
                        value,
                        Issue::warning(format!("value must be {:?}, not {:?}", preset, raw)),
                    )
                } else {
                    FieldDecode::ok(value)
                }
            }
            FieldKind::Enumerated(choices) => {
                let value = stripped(raw);
                match value {
                    Some(code) if !choices.iter().any(|(c, _)| *c == code) => FieldDecode::with(
                        Some(Value::Text(code)),
                        Issue::field_error(format!("value must be one of {}", one_of(choices))),
                    ),
                    other => FieldDecode::ok(other.map(Value::Text)),
                }
            }
            FieldKind::Flag => match raw {
                "Y" => FieldDecode::ok(Some(Value::Bool(true))),
                "N" => FieldDecode::ok(Some(Value::Bool(false))),
                // Explicit unknown satisfies a mandatory flag.
                "U" => return Ok(FieldDecode::ok(None)),
                " " => FieldDecode::ok(None),
                other => FieldDecode::with(
                    stripped(other).map(Value::Text),
                    Issue::field_error(format!("value must be one of {}", FLAG_CODES)),
                ),
            },
            FieldKind::Boolean => match raw {
                "Y" => FieldDecode::ok(Some(Value::Bool(true))),
                "N" => FieldDecode::ok(Some(Value::Bool(false))),
                " " => FieldDecode::ok(None),
                other => FieldDecode::with(
                    stripped(other).map(Value::Text),
                    Issue::field_error(format!("value must be one of {}", BOOLEAN_CODES)),
                ),
            },
        };
        if out.value.is_none() && self.mandatory {
            out.issue = worse(out.issue, Some(mandatory_issue()));
        }
        Ok(out)
    }

    fn decode_numeric(&self, raw: &str) -> Result<FieldDecode, RecordError> {
        let s = raw.trim();
        if s.is_empty() {
            return Ok(FieldDecode::ok(None));
        }
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RecordError::NotNumeric {
                field: self.name.clone(),
                value: raw.to_string(),
            });
        }
        // range is decided on the digits, so any width of well-formed digits decodes or
        // reports out of range
        let significant = digits.trim_start_matches('0');
        if (negative && !significant.is_empty()) || significant.len() > self.width {
            return Ok(FieldDecode::with(None, self.out_of_range(s)));
        }
        if significant.is_empty() {
            return Ok(FieldDecode::ok(Some(Value::Number(0))));
        }
        match significant.parse::<u64>() {
            Ok(v) => Ok(FieldDecode::ok(Some(Value::Number(v)))),
            Err(_) => Ok(FieldDecode::with(None, self.out_of_range(s))),
        }
    }

    fn out_of_range(&self, n: impl std::fmt::Display) -> Issue {
        let max = "9".repeat(self.width);
        Issue::field_error(format!("value {} out of range, not between 0 and {}", n, max))
    }

    /// Encode to exactly `width` characters. Never fails; content that does not fit is cut.
    pub fn encode(&self, value: Option<&Value>) -> String {
        let w = self.width;
        match &self.kind {
            FieldKind::Text | FieldKind::Enumerated(_) => {
                let s = value.map(Value::to_string).unwrap_or_default();
                fit_left(&s, w)
            }
            FieldKind::Numeric => {
                let digits = match value {
                    Some(Value::Number(n)) => n.to_string(),
                    _ => String::new(),
                };
                fit_right_zero(&digits, w)
            }
            FieldKind::Constant(preset) => preset.clone(),
            FieldKind::Flag => match value {
                Some(Value::Bool(true)) => "Y".to_string(),
                Some(Value::Bool(false)) => "N".to_string(),
                None if self.mandatory => "U".to_string(),
                _ => " ".to_string(),
            },
            FieldKind::Boolean => match value {
                Some(Value::Bool(true)) => "Y".to_string(),
                Some(Value::Bool(false)) => "N".to_string(),
                _ => " ".to_string(),
            },
        }
    }

    /// Validate a value assigned directly (not decoded from text).
    pub fn check(&self, value: Option<&Value>) -> Option<Issue> {
        let v = match value {
            None if self.mandatory => return Some(mandatory_issue()),
            None => return None,
            Some(v) => v,
        };
        match (&self.kind, v) {
            (FieldKind::Text, v) => {
                let len = v.to_string().chars().count();
                (len > self.width)
                    .then(|| Issue::field_error(format!("value is longer than {} characters", self.width)))
            }
            (FieldKind::Numeric, Value::Number(n)) => {
                let fits = upper_bound(self.width).map_or(true, |max| i128::from(*n) < max);
                (!fits).then(|| self.out_of_range(n))
            }
            (FieldKind::Numeric, other) => Some(Issue::field_error(format!("value {:?} is not numeric", other.to_string()))),
            (FieldKind::Constant(preset), v) => {
                let s = v.to_string();
                (s != preset.trim()).then(|| Issue::warning(format!("value must be {:?}, not {:?}", preset, s)))
            }
            (FieldKind::Enumerated(choices), v) => {
                let s = v.to_string();
                (!choices.iter().any(|(c, _)| *c == s))
                    .then(|| Issue::field_error(format!("value must be one of {}", one_of(choices))))
            }
            (FieldKind::Flag, Value::Bool(_)) | (FieldKind::Boolean, Value::Bool(_)) => None,
            (FieldKind::Flag, _) => Some(Issue::field_error(format!("value must be one of {}", FLAG_CODES))),
            (FieldKind::Boolean, _) => Some(Issue::field_error(format!("value must be one of {}", BOOLEAN_CODES))),
        }
    }

    /// Human-readable label for enumerated, flag and boolean values.
    pub fn verbose_label(&self, value: Option<&Value>) -> Option<String> {
        match (&self.kind, value) {
            (FieldKind::Enumerated(choices), Some(v)) => {
                let code = v.to_string();
                let label = choices.iter().find(|(c, _)| *c == code).map(|(_, l)| l.clone());
                Some(label.unwrap_or(code))
            }
            (FieldKind::Flag, None) => Some("Unknown".to_string()),
            (FieldKind::Flag, Some(Value::Bool(b))) | (FieldKind::Boolean, Some(Value::Bool(b))) => {
                Some(if *b { "Yes" } else { "No" }.to_string())
            }
            _ => None,
        }
    }
}

fn fit_left(s: &str, width: usize) -> String {
    let cut: String = s.chars().take(width).collect();
    format!("{:<width$}", cut, width = width)
}

fn fit_right_zero(digits: &str, width: usize) -> String {
    let len = digits.chars().count();
    if len > width {
        digits.chars().skip(len - width).collect()
    } else {
        format!("{:0>width$}", digits, width = width)
    }
}
