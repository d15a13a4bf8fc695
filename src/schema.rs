//! Recognized keys, their lexical classes, and typed values.
//!
//! A [`Schema`] is the fixed set of keys a synchronizer understands. Each key
//! carries a [`ValueKind`] that decides how its value token is delimited on an
//! assignment line and how it is parsed into a [`Value`].

use std::fmt;

use serde::Serialize;

use crate::devices;

/// Lexical class of a value token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueKind {
    /// A maximal run of non-whitespace characters.
    BareWord,
    /// One or more decimal digits.
    Integer,
    /// Digits, optionally followed by `.` and more digits.
    Decimal,
    /// Everything up to the end of the line, inner spaces included.
    FreeText,
}

impl ValueKind {
    pub fn describe(self) -> &'static str {
        match self {
            ValueKind::BareWord => "bare word",
            ValueKind::Integer => "integer",
            ValueKind::Decimal => "decimal",
            ValueKind::FreeText => "free text",
        }
    }

    /// Whether `raw` belongs to this lexical class.
    pub fn admits(self, raw: &str) -> bool {
        match self {
            ValueKind::BareWord => !raw.is_empty() && !raw.chars().any(char::is_whitespace),
            ValueKind::Integer => !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()),
            ValueKind::Decimal => {
                let (int, frac) = match raw.split_once('.') {
                    Some((i, f)) => (i, Some(f)),
                    None => (raw, None),
                };
                let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
                digits(int) && frac.is_none_or(digits)
            }
            ValueKind::FreeText => !raw.contains(['\n', '\r']),
        }
    }

    /// Parse a raw token into a typed value. Never coerces: a token outside
    /// the class is an error carrying the raw text.
    pub fn parse(self, raw: &str) -> Result<Value, &'static str> {
        if !self.admits(raw) {
            return Err(self.describe());
        }
        match self {
            ValueKind::BareWord => Ok(Value::Word(raw.to_string())),
            ValueKind::Integer => raw
                .parse::<u64>()
                .map(Value::Integer)
                .map_err(|_| self.describe()),
            ValueKind::Decimal => raw
                .parse::<f64>()
                .map(Value::Decimal)
                .map_err(|_| self.describe()),
            ValueKind::FreeText => Ok(Value::Text(raw.to_string())),
        }
    }
}

/// A typed value for a recognized key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Word(String),
    Integer(u64),
    Decimal(f64),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Word(_) => ValueKind::BareWord,
            Value::Integer(_) => ValueKind::Integer,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Text(_) => ValueKind::FreeText,
        }
    }

    /// Canonical render form of this value.
    pub fn render(&self, format: DecimalFormat) -> String {
        match self {
            Value::Word(s) | Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(f) => format.render(*f),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Word(s) | Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            Value::Decimal(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(DecimalFormat::default()))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Word(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Word(s)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Value::Integer(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Decimal(f)
    }
}

/// How decimal values are written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecimalFormat {
    /// Shortest text that reads back to the same `f64`, always with a
    /// fractional part (`5.0`, `3.3`).
    #[default]
    Shortest,
    /// Fixed number of digits after the point.
    Fixed(usize),
}

impl DecimalFormat {
    pub fn render(self, value: f64) -> String {
        match self {
            DecimalFormat::Shortest => format!("{value:?}"),
            DecimalFormat::Fixed(precision) => format!("{value:.precision$}"),
        }
    }
}

/// One recognized key.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub kind: ValueKind,
    /// Accepted values, checked when the field is updated.
    pub choices: Option<&'static [&'static str]>,
}

impl FieldSpec {
    pub const fn new(key: &'static str, kind: ValueKind) -> Self {
        Self {
            key,
            kind,
            choices: None,
        }
    }

    pub const fn with_choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = Some(choices);
        self
    }
}

/// The set of recognized keys plus the seed-document template.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    header: &'static str,
    body: &'static str,
}

pub const MAKEFILE_HEADER: &str = include_str!("template/header.mk");
pub const MAKEFILE_BODY: &str = include_str!("template/body.mk");

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            header: "",
            body: "",
        }
    }

    /// Attach the commented header and the opaque structural body used by
    /// default-document rendering.
    pub fn with_template(mut self, header: &'static str, body: &'static str) -> Self {
        self.header = header;
        self.body = body;
        self
    }

    /// The Padauk Makefile keys, in the order the seed document lists them.
    pub fn makefile() -> Self {
        Self::new(vec![
            FieldSpec::new("DEVICE", ValueKind::BareWord).with_choices(devices::DEVICE_NAMES),
            FieldSpec::new("ARCH", ValueKind::BareWord).with_choices(devices::ARCHITECTURES),
            FieldSpec::new("PROJECT_NAME", ValueKind::BareWord),
            FieldSpec::new("F_CPU", ValueKind::Integer),
            FieldSpec::new("TARGET_VDD_MV", ValueKind::Integer),
            FieldSpec::new("TARGET_VDD", ValueKind::Decimal),
            FieldSpec::new("OPT_FLAGS", ValueKind::FreeText),
        ])
        .with_template(MAKEFILE_HEADER, MAKEFILE_BODY)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.key)
    }

    pub fn header(&self) -> &'static str {
        self.header
    }

    pub fn body(&self) -> &'static str {
        self.body
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::makefile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_class_rejects_suffixes() {
        assert!(ValueKind::Integer.admits("8000000"));
        assert!(!ValueKind::Integer.admits("8000000UL"));
        assert!(!ValueKind::Integer.admits("-1"));
        assert!(!ValueKind::Integer.admits(""));
    }

    #[test]
    fn decimal_class() {
        assert!(ValueKind::Decimal.admits("5"));
        assert!(ValueKind::Decimal.admits("3.3"));
        assert!(!ValueKind::Decimal.admits("5."));
        assert!(!ValueKind::Decimal.admits(".5"));
        assert!(!ValueKind::Decimal.admits("1e3"));
        assert!(!ValueKind::Decimal.admits("1.2.3"));
    }

    #[test]
    fn bare_word_class() {
        assert!(ValueKind::BareWord.admits("PFS154"));
        assert!(!ValueKind::BareWord.admits("two words"));
        assert!(!ValueKind::BareWord.admits(""));
    }

    #[test]
    fn parse_integer_overflow_is_mismatch() {
        let err = ValueKind::Integer.parse("99999999999999999999999").unwrap_err();
        assert_eq!(err, "integer");
    }

    #[test]
    fn parse_never_coerces() {
        assert_eq!(ValueKind::Integer.parse("abc"), Err("integer"));
        assert_eq!(ValueKind::Decimal.parse("five"), Err("decimal"));
    }

    #[test]
    fn shortest_keeps_fraction() {
        assert_eq!(DecimalFormat::Shortest.render(5.0), "5.0");
        assert_eq!(DecimalFormat::Shortest.render(3.3), "3.3");
    }

    #[test]
    fn fixed_precision() {
        assert_eq!(DecimalFormat::Fixed(2).render(3.3), "3.30");
        assert_eq!(DecimalFormat::Fixed(0).render(5.0), "5");
    }

    #[test]
    fn makefile_schema_order() {
        let keys: Vec<&str> = Schema::makefile().keys().collect();
        assert_eq!(
            keys,
            [
                "DEVICE",
                "ARCH",
                "PROJECT_NAME",
                "F_CPU",
                "TARGET_VDD_MV",
                "TARGET_VDD",
                "OPT_FLAGS"
            ]
        );
    }

    #[test]
    fn template_body_is_tab_indented() {
        assert!(MAKEFILE_BODY.contains("\n\t$(COMPILE) -o $@ $<\n"));
    }

    #[test]
    fn conversions_pick_the_matching_variant() {
        assert_eq!(Value::from("PFS154"), Value::Word("PFS154".into()));
        assert_eq!(Value::from(String::from("pdk14")), Value::Word("pdk14".into()));
        assert_eq!(Value::from(5000u32), Value::Integer(5000));
        assert_eq!(Value::from(8_000_000u64).kind(), ValueKind::Integer);
        assert_eq!(Value::from(3.3).as_decimal(), Some(3.3));
    }
}
