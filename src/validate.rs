//! Input validation.
//!
//! Two unrelated checks live here:
//!
//! - [`check_update`] gates every value before it is substituted into a
//!   document. A value must render into its key's lexical class, must not
//!   break line structure, must not contain `=` or mention another recognized
//!   key, and must be one of the key's choices when it has any.
//! - [`validate_unknown_settings`] is strict mode for the `makefig.toml`
//!   defaults file: it uses `serde_ignored` to deserialize into
//!   `C::Layer` (all-optional fields) and reports keys the layer doesn't
//!   consume, with their line numbers.

use std::path::Path;

use confique::Config;
use serde::Deserialize;

use crate::error::MakefigError;
use crate::schema::{DecimalFormat, Schema, Value, ValueKind};

/// Validate one update and return its canonical render form.
pub fn check_update(
    schema: &Schema,
    key: &str,
    value: &Value,
    format: DecimalFormat,
) -> Result<String, MakefigError> {
    let field = schema
        .field(key)
        .ok_or_else(|| MakefigError::UnknownKey(key.into()))?;

    let rendered = value.render(format);

    if !conforms(value, field.kind) {
        return Err(MakefigError::TypeMismatch {
            key: key.into(),
            raw: rendered,
            expected: field.kind.describe(),
        });
    }

    let invalid = |reason: String| MakefigError::InvalidValue {
        key: key.into(),
        reason,
    };

    if !field.kind.admits(&rendered) {
        return Err(invalid(format!(
            "'{rendered}' is not a valid {}",
            field.kind.describe()
        )));
    }
    if field.kind == ValueKind::FreeText && rendered.trim() != rendered {
        return Err(invalid("leading or trailing whitespace".into()));
    }
    if rendered.contains('=') {
        return Err(invalid(format!("'{rendered}' contains '='")));
    }
    if let Some(other) = schema.keys().find(|k| mentions(&rendered, k)) {
        return Err(invalid(format!("'{rendered}' mentions the key {other}")));
    }
    if let Some(choices) = field.choices
        && !choices.contains(&rendered.as_str())
    {
        return Err(invalid(format!(
            "'{rendered}' is not one of: {}",
            choices.join(", ")
        )));
    }

    Ok(rendered)
}

/// Strings fit either string-like class; numbers must match exactly.
fn conforms(value: &Value, kind: ValueKind) -> bool {
    matches!(
        (value, kind),
        (Value::Word(_) | Value::Text(_), ValueKind::BareWord | ValueKind::FreeText)
            | (Value::Integer(_), ValueKind::Integer)
            | (Value::Decimal(_), ValueKind::Decimal)
    )
}

/// Whether `key` occurs in `text` as a whole identifier.
fn mentions(text: &str, key: &str) -> bool {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    text.match_indices(key).any(|(at, _)| {
        let before = text[..at].chars().next_back();
        let after = text[at + key.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

/// Validate that a defaults file contains no keys unknown to config type `C`.
pub fn validate_unknown_settings<C: Config>(
    content: &str,
    path: &Path,
) -> Result<(), MakefigError>
where
    C::Layer: for<'de> Deserialize<'de>,
{
    let mut unknown: Vec<String> = Vec::new();

    let deserializer = toml::Deserializer::new(content);
    let _layer: C::Layer = serde_ignored::deserialize(deserializer, |ignored| {
        unknown.push(ignored.to_string());
    })
    .map_err(|e| MakefigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    if unknown.is_empty() {
        return Ok(());
    }

    let errors = unknown
        .into_iter()
        .map(|key| MakefigError::UnknownSetting {
            line: find_setting_line(content, &key),
            key,
            path: path.to_path_buf(),
        })
        .collect();

    Err(MakefigError::UnknownSettings(errors))
}

/// 1-indexed line of a top-level `key = ...` in TOML text, 0 if not found.
fn find_setting_line(content: &str, key: &str) -> usize {
    content
        .lines()
        .position(|line| {
            line.trim_start()
                .strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with('='))
        })
        .map_or(0, |i| i + 1)
}
