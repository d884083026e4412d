//! Record decoding and re-encoding.
//!
//! `decode` applies a [`RecordSchema`] to a raw payload and produces a
//! [`DecodedRecord`]; `encode_record` inverts it for the schemas that
//! are written back to the device (settings records). Both are pure
//! functions over the buffer: no I/O, no shared state.

use std::net::Ipv4Addr;

use crate::error::{DecodeError, EncodeError};
use crate::schema::{FieldDescriptor, FieldKind, RecordSchema, RepeatingSchema};
use crate::value::{DecodedRecord, Value};

/// Decodes a fixed-size payload. The payload length must match the
/// schema exactly; there is no truncation or best-effort parse.
pub fn decode(schema: &RecordSchema, bytes: &[u8]) -> Result<DecodedRecord, DecodeError> {
    if bytes.len() != schema.total_len {
        return Err(DecodeError::LengthMismatch {
            schema: schema.name,
            expected: schema.total_len,
            actual: bytes.len(),
        });
    }
    let mut record = DecodedRecord::with_capacity(schema.name, schema.fields.len());
    for f in schema.fields {
        let raw = &bytes[f.offset..f.offset + f.len];
        record.set(f.name, decode_field(schema.name, f, raw)?);
    }
    Ok(record)
}

/// Little-endian unsigned read, 1 to 8 bytes.
fn read_uint(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

/// Little-endian two's-complement read, 1 to 8 bytes.
fn read_int(bytes: &[u8]) -> i64 {
    let raw = read_uint(bytes);
    let shift = 64 - 8 * bytes.len() as u32;
    ((raw << shift) as i64) >> shift
}

fn decode_field(
    schema: &'static str,
    f: &FieldDescriptor,
    raw: &[u8],
) -> Result<Value, DecodeError> {
    let value = match f.kind {
        FieldKind::UInt => transformed_uint(f, read_uint(raw)),
        FieldKind::Int => {
            let v = read_int(raw);
            match f.transform {
                Some(t) if !t.is_identity() => Value::Float(t.apply(v as f64)),
                _ => Value::Int(v),
            }
        }
        FieldKind::Bool => {
            // Exactly 0x01 is true. Other values (including zero) stay
            // raw; alarm countdown codes share these bytes.
            match raw[0] {
                0x01 => Value::Bool(true),
                other => Value::UInt(u64::from(other)),
            }
        }
        FieldKind::Bitfield(table) => {
            let bits = read_uint(raw);
            let mut tags = Vec::new();
            let mut named = 0u64;
            for (bit, tag) in table {
                let mask = 1u64 << bit;
                named |= mask;
                if bits & mask != 0 {
                    tags.push(*tag);
                }
            }
            Value::Bits { raw: bits, tags, residual: bits & !named }
        }
        FieldKind::Enum(table) => {
            let v = read_uint(raw);
            let tag = table.iter().find(|(val, _)| *val == v).map(|(_, tag)| *tag);
            Value::Enum { raw: v, tag }
        }
        FieldKind::Str { terminator } => {
            let end = raw.iter().position(|b| *b == terminator).unwrap_or(raw.len());
            let text = std::str::from_utf8(&raw[..end]).map_err(|e| {
                DecodeError::MalformedField {
                    schema,
                    field: f.name,
                    reason: e.to_string(),
                }
            })?;
            Value::Text(text.to_string())
        }
        FieldKind::Bytes => Value::Bytes(raw.to_vec()),
        FieldKind::Ipv4 => {
            // The one endianness exception in this protocol: stored
            // byte-reversed relative to dotted-quad order.
            Value::Ipv4(Ipv4Addr::new(raw[3], raw[2], raw[1], raw[0]))
        }
    };
    Ok(value)
}

fn transformed_uint(f: &FieldDescriptor, raw: u64) -> Value {
    match f.transform {
        Some(t) if !t.is_identity() => Value::Float(t.apply(raw as f64)),
        _ => Value::UInt(raw),
    }
}

/// Re-encodes a decoded record into payload bytes.
///
/// Requires a value for every field of the schema, which a record
/// decoded with the same schema always has; reserved blobs carry their
/// original bytes, so decode followed by encode is byte-identical.
pub fn encode_record(schema: &RecordSchema, record: &DecodedRecord) -> Result<Vec<u8>, EncodeError> {
    let mut buf = vec![0u8; schema.total_len];
    for f in schema.fields {
        let value = record.get(f.name).ok_or(EncodeError::MissingField {
            schema: schema.name,
            field: f.name,
        })?;
        encode_field_into(schema.name, f, value, &mut buf)?;
    }
    Ok(buf)
}

fn write_uint(
    schema: &'static str,
    f: &FieldDescriptor,
    raw: u64,
    buf: &mut [u8],
) -> Result<(), EncodeError> {
    if f.len < 8 && raw >= 1u64 << (8 * f.len) {
        return Err(EncodeError::ValueMismatch {
            schema,
            field: f.name,
            reason: format!("{raw} does not fit in {} bytes", f.len),
        });
    }
    for (i, slot) in buf[f.offset..f.offset + f.len].iter_mut().enumerate() {
        *slot = (raw >> (8 * i)) as u8;
    }
    Ok(())
}

/// Inverts a scale/offset transform back to the raw integer.
fn untransform(
    schema: &'static str,
    f: &FieldDescriptor,
    value: f64,
) -> Result<i64, EncodeError> {
    let raw = match f.transform {
        Some(t) if !t.is_identity() => t.invert(value).round(),
        _ => value.round(),
    };
    if !raw.is_finite() || raw < i64::MIN as f64 || raw > i64::MAX as f64 {
        return Err(EncodeError::ValueMismatch {
            schema,
            field: f.name,
            reason: format!("{value} is outside the encodable range"),
        });
    }
    Ok(raw as i64)
}

fn encode_field_into(
    schema: &'static str,
    f: &FieldDescriptor,
    value: &Value,
    buf: &mut [u8],
) -> Result<(), EncodeError> {
    let mismatch = |reason: String| EncodeError::ValueMismatch {
        schema,
        field: f.name,
        reason,
    };
    match (f.kind, value) {
        (FieldKind::UInt, Value::UInt(v)) => write_uint(schema, f, *v, buf)?,
        (FieldKind::UInt, Value::Float(v)) => {
            let raw = untransform(schema, f, *v)?;
            if raw < 0 {
                return Err(mismatch(format!("{v} maps to a negative raw value")));
            }
            write_uint(schema, f, raw as u64, buf)?;
        }
        (FieldKind::Int, Value::Int(v)) => write_int(schema, f, *v, buf)?,
        (FieldKind::Int, Value::Float(v)) => {
            let raw = untransform(schema, f, *v)?;
            write_int(schema, f, raw, buf)?;
        }
        (FieldKind::Bool, Value::Bool(v)) => buf[f.offset] = u8::from(*v),
        // Raw codes preserved by the decoder go back verbatim.
        (FieldKind::Bool, Value::UInt(v)) => {
            if *v > u64::from(u8::MAX) {
                return Err(mismatch(format!("{v} does not fit in one byte")));
            }
            buf[f.offset] = *v as u8;
        }
        (FieldKind::Bitfield(_), Value::Bits { raw, .. })
        | (FieldKind::Bitfield(_), Value::UInt(raw)) => write_uint(schema, f, *raw, buf)?,
        (FieldKind::Enum(_), Value::Enum { raw, .. })
        | (FieldKind::Enum(_), Value::UInt(raw)) => write_uint(schema, f, *raw, buf)?,
        (FieldKind::Str { terminator }, Value::Text(s)) => {
            if s.len() > f.len {
                return Err(mismatch(format!(
                    "string of {} bytes exceeds field length {}",
                    s.len(),
                    f.len
                )));
            }
            buf[f.offset..f.offset + s.len()].copy_from_slice(s.as_bytes());
            if s.len() < f.len {
                buf[f.offset + s.len()] = terminator;
            }
        }
        (FieldKind::Bytes, Value::Bytes(b)) => {
            if b.len() != f.len {
                return Err(mismatch(format!(
                    "blob of {} bytes for a {}-byte field",
                    b.len(),
                    f.len
                )));
            }
            buf[f.offset..f.offset + f.len].copy_from_slice(b);
        }
        (FieldKind::Ipv4, Value::Ipv4(addr)) => {
            let o = addr.octets();
            buf[f.offset..f.offset + 4].copy_from_slice(&[o[3], o[2], o[1], o[0]]);
        }
        (_, other) => {
            return Err(mismatch(format!("value {other:?} does not match the field kind")));
        }
    }
    Ok(())
}

fn write_int(
    schema: &'static str,
    f: &FieldDescriptor,
    raw: i64,
    buf: &mut [u8],
) -> Result<(), EncodeError> {
    if f.len < 8 {
        let min = -(1i64 << (8 * f.len - 1));
        let max = (1i64 << (8 * f.len - 1)) - 1;
        if raw < min || raw > max {
            return Err(EncodeError::ValueMismatch {
                schema,
                field: f.name,
                reason: format!("{raw} does not fit in {} signed bytes", f.len),
            });
        }
    }
    for (i, slot) in buf[f.offset..f.offset + f.len].iter_mut().enumerate() {
        *slot = (raw >> (8 * i)) as u8;
    }
    Ok(())
}

/// Decodes a count-prefixed payload into a lazy sequence of entries.
///
/// The header is decoded first; the total length must then equal
/// `header + count * stride` exactly. A zero count is a valid empty
/// sequence, not an error.
pub fn decode_repeating<'a>(
    schema: &'static RepeatingSchema,
    bytes: &'a [u8],
) -> Result<Entries<'a>, DecodeError> {
    let header_len = schema.header_len();
    if bytes.len() < header_len {
        return Err(DecodeError::LengthMismatch {
            schema: schema.name,
            expected: header_len,
            actual: bytes.len(),
        });
    }
    let header = decode(&schema.header, &bytes[..header_len])?;
    let count = header
        .get(schema.count_field)
        .and_then(Value::as_u64)
        .ok_or(DecodeError::MalformedField {
            schema: schema.name,
            field: schema.count_field,
            reason: "count field did not decode to an integer".to_string(),
        })? as usize;

    let expected = header_len + count * schema.stride();
    if bytes.len() != expected {
        return Err(DecodeError::LengthMismatch {
            schema: schema.name,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(Entries { schema, bytes, index: 0, count })
}

/// Lazy, finite sequence of repeating-block entries.
///
/// Carries no state beyond an index into the original buffer, so it is
/// restartable: [`Entries::restart`] (or a plain `clone` taken before
/// iterating) re-derives the same sequence.
#[derive(Debug, Clone, Copy)]
pub struct Entries<'a> {
    schema: &'static RepeatingSchema,
    bytes: &'a [u8],
    index: usize,
    count: usize,
}

impl<'a> Entries<'a> {
    /// Entry count announced by the payload header.
    pub fn count(&self) -> usize {
        self.count
    }

    /// A fresh iterator over the same buffer, starting at entry zero.
    pub fn restart(&self) -> Entries<'a> {
        Entries { index: 0, ..self.clone() }
    }
}

impl Iterator for Entries<'_> {
    type Item = Result<DecodedRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let stride = self.schema.stride();
        let start = self.schema.header_len() + self.index * stride;
        self.index += 1;
        Some(decode(&self.schema.entry, &self.bytes[start..start + stride]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Entries<'_> {}
