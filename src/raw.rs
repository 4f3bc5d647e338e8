//! Raw provider records.
//!
//! A [`RawRecord`] is the loosely-typed key/value bag read from a provider collection.
//! Formats access it through their own tag enums implementing [`FieldTag`], which gives
//! every format an explicit schema of optional attributes and a single get-or-default
//! path instead of ad-hoc membership checks.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::warn;

/// Scalar value stored under a raw field code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Text view of the value, `None` for nulls, NaN and blank strings.
    ///
    /// Text is right-trimmed; integral floats are rendered without a fraction.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RawValue::Null => None,
            RawValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            RawValue::Int(i) => Some(Cow::Owned(i.to_string())),
            RawValue::Float(f) if f.is_nan() => None,
            RawValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
                Some(Cow::Owned(format!("{}", *f as i64)))
            }
            RawValue::Float(f) => Some(Cow::Owned(f.to_string())),
            RawValue::Text(s) => {
                let trimmed = s.trim_end();
                if trimmed.trim_start().is_empty() {
                    None
                } else {
                    Some(Cow::Borrowed(trimmed))
                }
            }
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Int(value)
    }
}

/// A field code of a raw format.
pub trait FieldTag: Copy {
    /// The field code as stored in the raw record.
    fn as_tag(&self) -> &'static str;
}

/// Immutable mapping of format-specific field codes to raw values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, RawValue>,
}

impl RawRecord {
    pub fn new(fields: BTreeMap<String, RawValue>) -> Self {
        Self { fields }
    }

    /// Builds a record from `(code, value)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<RawValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parses a record from a JSON object.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Raw value stored under an arbitrary code.
    pub fn value(&self, code: &str) -> Option<&RawValue> {
        self.fields.get(code)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field codes present in the record, in sorted order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Text of a field, `None` when absent, null, NaN or blank.
    pub fn field<T: FieldTag>(&self, tag: T) -> Option<Cow<'_, str>> {
        self.fields.get(tag.as_tag()).and_then(RawValue::as_text)
    }

    /// Text of a field, empty when absent.
    pub fn field_or_default<T: FieldTag>(&self, tag: T) -> Cow<'_, str> {
        self.field(tag).unwrap_or(Cow::Borrowed(""))
    }

    /// Non-empty trimmed entries of a field split on `separator`.
    pub fn split<T: FieldTag>(&self, tag: T, separator: &str) -> Vec<String> {
        self.field(tag)
            .map(|text| {
                text.split(separator)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Newline-separated entries of a multi-valued field.
    pub fn lines<T: FieldTag>(&self, tag: T) -> Vec<String> {
        self.split(tag, "\n")
    }

    /// Parses a scalar field.
    ///
    /// Absent fields yield `None` silently; malformed values are logged and yield `None`.
    pub fn parse<T: FieldTag, V: FromStr>(&self, tag: T) -> Option<V> {
        let text = self.field(tag)?;
        match text.trim().parse::<V>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(field = tag.as_tag(), value = %text, "could not parse field value");
                None
            }
        }
    }
}
