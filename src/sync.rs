//! The synchronizer: load recognized keys out of a document and write updated
//! values back without touching anything else.
//!
//! Matching is a line-by-line scan. An assignment line is one that, after
//! optional leading spaces, starts with a recognized key, then optional
//! whitespace, then `=`. Lines starting with a tab are recipe lines and never
//! match. For every key only the first assignment line in document order is
//! authoritative, and substitution is confined to the value token on that
//! line, so key-like text inside another key's value can never be picked up.
//!
//! All operations here are pure: they take text and return text. Reading and
//! writing files is [`persist`](crate::persist)'s job.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::ops::Range;

use serde::Serialize;

use crate::error::MakefigError;
use crate::schema::{DecimalFormat, FieldSpec, Schema, Value, ValueKind};
use crate::validate;

/// A located assignment line for one recognized key.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<'a> {
    pub key: &'static str,
    pub kind: ValueKind,
    /// 1-indexed line number.
    pub line: usize,
    /// Byte range of the value token within the document.
    pub span: Range<usize>,
    pub raw: &'a str,
}

/// Outcome of looking for one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum FieldStatus {
    Found { value: Value, line: usize },
    NotFound,
    Mismatch {
        raw: String,
        expected: &'static str,
        line: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldReport {
    pub key: &'static str,
    #[serde(flatten)]
    pub status: FieldStatus,
}

/// Result of a successful [`Synchronizer::load`]: a value for every key that
/// was found, and an explicit "not found" for every key that was not.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadedFields {
    entries: Vec<(&'static str, Option<Value>)>,
}

impl LoadedFields {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn is_found(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The value for `key`, or [`MakefigError::KeyNotFound`].
    pub fn require(&self, key: &str) -> Result<&Value, MakefigError> {
        self.get(key)
            .ok_or_else(|| MakefigError::KeyNotFound(key.into()))
    }

    /// Recognized keys with no assignment in the document.
    pub fn missing(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&Value>)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v.as_ref()))
    }
}

/// Key → new value, applied by [`Synchronizer::apply`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Updates(BTreeMap<String, Value>);

impl Updates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable insert.
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for Updates {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Loads and rewrites documents for one [`Schema`].
///
/// Stateless across calls; a single instance can serve any number of
/// documents from any number of threads.
#[derive(Debug, Clone, Default)]
pub struct Synchronizer {
    schema: Schema,
    decimal_format: DecimalFormat,
}

impl Synchronizer {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            decimal_format: DecimalFormat::default(),
        }
    }

    pub fn decimal_format(mut self, format: DecimalFormat) -> Self {
        self.decimal_format = format;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// First assignment line for every recognized key, in document order.
    pub fn assignments<'a>(&self, text: &'a str) -> Vec<Assignment<'a>> {
        let fields = self.schema.fields();
        let mut slots: Vec<Option<Assignment<'a>>> = vec![None; fields.len()];

        // A leading byte-order mark belongs to no line.
        let (mut offset, body) = match text.strip_prefix('\u{feff}') {
            Some(rest) => ('\u{feff}'.len_utf8(), rest),
            None => (0, text),
        };
        for (index, line) in body.split_inclusive('\n').enumerate() {
            let start = offset;
            offset += line.len();

            let content = line.strip_suffix('\n').unwrap_or(line);
            let content = content.strip_suffix('\r').unwrap_or(content);

            let Some((slot, field, value)) = match_line(fields, content) else {
                continue;
            };
            if slots[slot].is_some() {
                continue;
            }
            let span = (start + value.start)..(start + value.end);
            slots[slot] = Some(Assignment {
                key: field.key,
                kind: field.kind,
                line: index + 1,
                raw: &text[span.clone()],
                span,
            });
        }

        let mut found: Vec<Assignment<'a>> = slots.into_iter().flatten().collect();
        found.sort_by_key(|a| a.span.start);
        found
    }

    /// Per-key status without failing on bad values. Reports follow schema
    /// order.
    pub fn inspect(&self, text: &str) -> Vec<FieldReport> {
        let located = self.assignments(text);
        self.schema
            .fields()
            .iter()
            .map(|field| {
                let status = match located.iter().find(|a| a.key == field.key) {
                    None => FieldStatus::NotFound,
                    Some(a) => match field.kind.parse(a.raw) {
                        Ok(value) => FieldStatus::Found {
                            value,
                            line: a.line,
                        },
                        Err(expected) => FieldStatus::Mismatch {
                            raw: a.raw.to_string(),
                            expected,
                            line: a.line,
                        },
                    },
                };
                FieldReport {
                    key: field.key,
                    status,
                }
            })
            .collect()
    }

    /// Parse every recognized key. A value that does not fit its key's class
    /// fails the whole load; missing keys are reported, not errors.
    pub fn load(&self, text: &str) -> Result<LoadedFields, MakefigError> {
        let mut entries = Vec::with_capacity(self.schema.fields().len());
        for report in self.inspect(text) {
            let value = match report.status {
                FieldStatus::Found { value, .. } => Some(value),
                FieldStatus::NotFound => None,
                FieldStatus::Mismatch { raw, expected, .. } => {
                    return Err(MakefigError::TypeMismatch {
                        key: report.key.into(),
                        raw,
                        expected,
                    });
                }
            };
            entries.push((report.key, value));
        }
        let loaded = LoadedFields { entries };
        tracing::debug!(
            missing = ?loaded.missing().collect::<Vec<_>>(),
            "loaded document"
        );
        Ok(loaded)
    }

    /// Seed document: header, one assignment per key in schema order, then
    /// the structural body. Every recognized key needs a default.
    pub fn render_default(&self, defaults: &Updates) -> Result<String, MakefigError> {
        for (key, _) in defaults.iter() {
            if self.schema.field(key).is_none() {
                return Err(MakefigError::UnknownKey(key.into()));
            }
        }

        let mut out = String::from(self.schema.header());
        for field in self.schema.fields() {
            let value = defaults
                .get(field.key)
                .ok_or_else(|| MakefigError::KeyNotFound(field.key.into()))?;
            let rendered =
                validate::check_update(&self.schema, field.key, value, self.decimal_format)?;
            let _ = writeln!(out, "{} = {}", field.key, rendered);
        }
        if !self.schema.body().is_empty() {
            out.push('\n');
            out.push_str(self.schema.body());
        }
        Ok(out)
    }

    /// Replace the value token of each updated key's assignment line.
    ///
    /// Every update is validated before anything is substituted. Keys with no
    /// assignment line are skipped; nothing is ever appended.
    pub fn apply(&self, text: &str, updates: &Updates) -> Result<String, MakefigError> {
        let mut rendered = Vec::with_capacity(updates.len());
        for (key, value) in updates.iter() {
            let text_form = validate::check_update(&self.schema, key, value, self.decimal_format)?;
            rendered.push((key, text_form));
        }

        let located = self.assignments(text);
        let mut splices: Vec<(Range<usize>, String)> = Vec::new();
        for (key, text_form) in rendered {
            match located.iter().find(|a| a.key == key) {
                Some(a) => splices.push((a.span.clone(), text_form)),
                None => tracing::debug!(key, "no assignment line, update skipped"),
            }
        }
        splices.sort_by_key(|(span, _)| span.start);

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (span, text_form) in splices {
            out.push_str(&text[cursor..span.start]);
            out.push_str(&text_form);
            cursor = span.end;
        }
        out.push_str(&text[cursor..]);
        Ok(out)
    }
}

/// Match one line (terminator stripped) against the schema. Returns the field
/// slot, the field, and the value token's byte range within the line.
fn match_line<'s>(
    fields: &'s [FieldSpec],
    content: &str,
) -> Option<(usize, &'s FieldSpec, Range<usize>)> {
    if content.starts_with('\t') {
        return None;
    }
    let indent = content.len() - content.trim_start_matches(' ').len();
    let rest = &content[indent..];

    let ident_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if ident_len == 0 {
        return None;
    }
    let ident = &rest[..ident_len];
    let (slot, field) = fields.iter().enumerate().find(|(_, f)| f.key == ident)?;

    let after_key = &rest[ident_len..];
    let after_ws = after_key.trim_start_matches([' ', '\t']);
    let after_eq = after_ws.strip_prefix('=')?;
    let value_text = after_eq.trim_start_matches([' ', '\t']);
    let value_start = content.len() - value_text.len();

    let value_len = match field.kind {
        ValueKind::FreeText => value_text.trim_end().len(),
        _ => value_text
            .find(char::is_whitespace)
            .unwrap_or(value_text.len()),
    };
    // A bare word needs at least one character; `KEY =` alone assigns nothing.
    if field.kind == ValueKind::BareWord && value_len == 0 {
        return None;
    }
    Some((slot, field, value_start..value_start + value_len))
}
