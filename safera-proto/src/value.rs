//! Decoded field values and the per-notification record they live in.

use std::net::Ipv4Addr;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One decoded field value.
///
/// Forward-compatibility shapes the variants: unknown enum values and
/// bitfield bits are carried as raw integers next to the recognized
/// tags, and reserved regions stay as verbatim bytes so a record can
/// be re-encoded losslessly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    UInt(u64),
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    /// Enum field: `raw` is always kept; `tag` is present only for
    /// documented values.
    Enum { raw: u64, tag: Option<&'static str> },
    /// Bitfield: tags for documented set bits plus the residual of
    /// set bits the table does not name.
    Bits {
        raw: u64,
        tags: Vec<&'static str>,
        residual: u64,
    },
    Bytes(Vec<u8>),
    Ipv4(Ipv4Addr),
}

impl Value {
    /// Raw unsigned view for integer-shaped variants.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Enum { raw, .. } => Some(*raw),
            Value::Bits { raw, .. } => Some(*raw),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::UInt(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// Named, typed view of one decoded payload.
///
/// Produced fresh per decode call and owned solely by the consumer;
/// field order follows the schema table.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    schema: &'static str,
    fields: Vec<(&'static str, Value)>,
}

impl DecodedRecord {
    pub fn new(schema: &'static str) -> Self {
        Self { schema, fields: Vec::new() }
    }

    pub(crate) fn with_capacity(schema: &'static str, capacity: usize) -> Self {
        Self { schema, fields: Vec::with_capacity(capacity) }
    }

    /// Name of the schema this record was decoded with.
    pub fn schema(&self) -> &'static str {
        self.schema
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Sets a field value, replacing any existing value of that name.
    /// Used by callers that mutate a read-back record before writing
    /// it to a settings characteristic.
    pub fn set(&mut self, name: &'static str, value: Value) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for DecodedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
