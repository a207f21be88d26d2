//! The structured result of one extraction call.
//!
//! [`ExtractedRecord`] keeps the model's JSON object exactly as returned,
//! including fields outside [`crate::schema::FIELDS`] and values of an
//! unexpected shape. Typed access goes through [`ExtractedRecord::get`],
//! which returns `None` for absent fields and a [`FieldValue`] view
//! otherwise.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Flat mapping from field name to extracted value.
///
/// Key order follows the model reply. Equality ignores key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedRecord {
    fields: Map<String, Value>,
}

impl ExtractedRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Parse a JSON document whose top level must be an object.
    pub fn from_json_str(text: &str) -> Result<Self, RecordParseError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(RecordParseError::NotAnObject(json_type_name(&other))),
        }
    }

    /// Typed view of a field; `None` when the key is absent.
    pub fn get(&self, name: &str) -> Option<FieldValue<'_>> {
        self.fields.get(name).map(FieldValue::from)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Raw JSON value of a field.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in reply order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldValue<'_>)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.as_str(), FieldValue::from(v)))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for ExtractedRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Why a reply could not become an [`ExtractedRecord`].
#[derive(Debug, thiserror::Error)]
pub enum RecordParseError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON object at the top level, got {0}")]
    NotAnObject(&'static str),
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Borrowed, typed view of one field value.
///
/// The prompt asks for strings, booleans and string arrays; numbers and
/// nested objects are passed through because the reply is not validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Null,
    Flag(bool),
    Text(&'a str),
    Number(&'a Number),
    List(&'a [Value]),
    Object(&'a Map<String, Value>),
}

impl<'a> From<&'a Value> for FieldValue<'a> {
    fn from(v: &'a Value) -> Self {
        match v {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Flag(*b),
            Value::String(s) => FieldValue::Text(s),
            Value::Number(n) => FieldValue::Number(n),
            Value::Array(items) => FieldValue::List(items),
            Value::Object(map) => FieldValue::Object(map),
        }
    }
}

impl<'a> FieldValue<'a> {
    /// Whether the value carries information worth displaying.
    ///
    /// Null, `false`, the empty string, empty arrays/objects and zero are
    /// empty. A whitespace-only string is still a value.
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Flag(b) => *b,
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
            FieldValue::List(items) => !items.is_empty(),
            FieldValue::Object(map) => !map.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            FieldValue::Flag(b) => Some(b),
            _ => None,
        }
    }

    /// String items of a list value; non-string items are skipped.
    pub fn as_string_list(&self) -> Option<Vec<&'a str>> {
        match *self {
            FieldValue::List(items) => Some(items.iter().filter_map(Value::as_str).collect()),
            _ => None,
        }
    }
}

/// Human-readable rendering used by the categorized view.
impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Flag(true) => f.write_str("Yes"),
            FieldValue::Flag(false) => f.write_str("No"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        Value::String(s) => f.write_str(s)?,
                        other => write!(f, "{other}")?,
                    }
                }
                Ok(())
            }
            FieldValue::Object(map) => {
                write!(f, "{}", Value::Object((*map).clone()))
            }
        }
    }
}
