//! Static payload layout model: field descriptors and record schemas.
//!
//! Every characteristic payload is described by a [`RecordSchema`], an
//! ordered table of [`FieldDescriptor`]s plus a total byte length.
//! Schemas are plain `static` data constructed once and shared
//! read-only across all decode calls; `validate` is asserted by tests
//! at build time rather than re-checked on every decode.
//!
//! All multi-byte integers on this device are little-endian. The one
//! documented exception is the IPv4 address field, which is stored
//! byte-reversed relative to dotted-quad order and gets its own
//! [`FieldKind::Ipv4`].

use crate::error::SchemaError;

/// Linear transform applied after raw extraction: `value = raw * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub offset: f64,
}

impl Transform {
    pub fn apply(self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }

    pub fn invert(self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }

    /// An identity transform keeps the raw integer type on decode.
    pub fn is_identity(self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }
}

/// How the bytes of one field are interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Unsigned little-endian integer, 1/2/4/8 bytes.
    UInt,
    /// Two's-complement little-endian integer, 1/2/4/8 bytes.
    Int,
    /// One byte where exactly `0x01` means true. Any other value is
    /// preserved as the raw integer; the device reuses nominally
    /// boolean bytes for countdown codes.
    Bool,
    /// Integer whose bits carry independent meanings. The table maps
    /// bit position to tag; set bits without a tag are retained in a
    /// residual, never dropped.
    Bitfield(&'static [(u32, &'static str)]),
    /// Integer with named values. Unknown values stay raw.
    Enum(&'static [(u64, &'static str)]),
    /// Fixed-length string, value ends at the first terminator byte
    /// (zero for most fields, `0x0a` for a few). Padding past the
    /// terminator is not part of the value.
    Str { terminator: u8 },
    /// Opaque bytes, kept verbatim so re-encoding is lossless. Used
    /// for reserved regions and fields with undocumented semantics.
    Bytes,
    /// 4 bytes holding an IPv4 address in byte-reversed order.
    Ipv4,
}

/// Declares how to read or write one scalar or blob at a byte offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub offset: usize,
    pub len: usize,
    pub kind: FieldKind,
    pub transform: Option<Transform>,
}

impl FieldDescriptor {
    pub const fn uint(name: &'static str, offset: usize, len: usize) -> Self {
        Self { name, offset, len, kind: FieldKind::UInt, transform: None }
    }

    pub const fn int(name: &'static str, offset: usize, len: usize) -> Self {
        Self { name, offset, len, kind: FieldKind::Int, transform: None }
    }

    /// Unsigned field with a `raw * scale + offset` transform.
    pub const fn scaled(
        name: &'static str,
        offset: usize,
        len: usize,
        scale: f64,
        shift: f64,
    ) -> Self {
        Self {
            name,
            offset,
            len,
            kind: FieldKind::UInt,
            transform: Some(Transform { scale, offset: shift }),
        }
    }

    pub const fn boolean(name: &'static str, offset: usize) -> Self {
        Self { name, offset, len: 1, kind: FieldKind::Bool, transform: None }
    }

    pub const fn bitfield(
        name: &'static str,
        offset: usize,
        len: usize,
        table: &'static [(u32, &'static str)],
    ) -> Self {
        Self { name, offset, len, kind: FieldKind::Bitfield(table), transform: None }
    }

    pub const fn enumeration(
        name: &'static str,
        offset: usize,
        table: &'static [(u64, &'static str)],
    ) -> Self {
        Self { name, offset, len: 1, kind: FieldKind::Enum(table), transform: None }
    }

    /// Zero-terminated, zero-padded string field.
    pub const fn string(name: &'static str, offset: usize, len: usize) -> Self {
        Self { name, offset, len, kind: FieldKind::Str { terminator: 0 }, transform: None }
    }

    pub const fn string_term(
        name: &'static str,
        offset: usize,
        len: usize,
        terminator: u8,
    ) -> Self {
        Self { name, offset, len, kind: FieldKind::Str { terminator }, transform: None }
    }

    /// Opaque reserved region, surfaced verbatim in the decoded record.
    pub const fn reserved(name: &'static str, offset: usize, len: usize) -> Self {
        Self { name, offset, len, kind: FieldKind::Bytes, transform: None }
    }

    pub const fn ipv4(name: &'static str, offset: usize) -> Self {
        Self { name, offset, len: 4, kind: FieldKind::Ipv4, transform: None }
    }

    fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Ordered, non-overlapping set of fields describing one fixed-size
/// characteristic payload.
#[derive(Debug, PartialEq)]
pub struct RecordSchema {
    pub name: &'static str,
    pub total_len: usize,
    pub fields: &'static [FieldDescriptor],
}

impl RecordSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Checks bounds, overlap and width constraints. Run once by the
    /// schema tests; decode trusts validated schemas.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for f in self.fields {
            if f.end() > self.total_len {
                return Err(SchemaError::FieldOutOfBounds {
                    schema: self.name,
                    field: f.name,
                    end: f.end(),
                    total: self.total_len,
                });
            }
            let width_ok = match f.kind {
                FieldKind::UInt | FieldKind::Int => matches!(f.len, 1 | 2 | 4 | 8),
                FieldKind::Bitfield(_) | FieldKind::Enum(_) => matches!(f.len, 1 | 2 | 4 | 8),
                FieldKind::Bool => f.len == 1,
                FieldKind::Ipv4 => f.len == 4,
                FieldKind::Str { .. } | FieldKind::Bytes => f.len > 0,
            };
            if !width_ok {
                return Err(SchemaError::BadWidth {
                    schema: self.name,
                    field: f.name,
                    len: f.len,
                });
            }
        }
        // Fields may overlap only when documented as aliases; this
        // protocol has none, so any overlap is a table mistake.
        for (i, a) in self.fields.iter().enumerate() {
            for b in &self.fields[i + 1..] {
                if a.offset < b.end() && b.offset < a.end() {
                    return Err(SchemaError::FieldOverlap {
                        schema: self.name,
                        first: a.name,
                        second: b.name,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Count-prefixed variable-length payload: header fields (including a
/// 16-bit entry count) followed by `count` entries of a fixed stride.
#[derive(Debug, PartialEq)]
pub struct RepeatingSchema {
    pub name: &'static str,
    pub header: RecordSchema,
    /// Name of the header field holding the entry count.
    pub count_field: &'static str,
    pub entry: RecordSchema,
}

impl RepeatingSchema {
    pub fn header_len(&self) -> usize {
        self.header.total_len
    }

    pub fn stride(&self) -> usize {
        self.entry.total_len
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        self.header.validate()?;
        self.entry.validate()?;
        if self.header.field(self.count_field).is_none() {
            return Err(SchemaError::MissingCountField {
                schema: self.name,
                field: self.count_field,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static GOOD: RecordSchema = RecordSchema {
        name: "GOOD",
        total_len: 4,
        fields: &[
            FieldDescriptor::uint("a", 0, 2),
            FieldDescriptor::uint("b", 2, 2),
        ],
    };

    static OUT_OF_BOUNDS: RecordSchema = RecordSchema {
        name: "OUT_OF_BOUNDS",
        total_len: 3,
        fields: &[FieldDescriptor::uint("a", 2, 2)],
    };

    static OVERLAPPING: RecordSchema = RecordSchema {
        name: "OVERLAPPING",
        total_len: 4,
        fields: &[
            FieldDescriptor::uint("a", 0, 2),
            FieldDescriptor::uint("b", 1, 2),
        ],
    };

    static BAD_WIDTH: RecordSchema = RecordSchema {
        name: "BAD_WIDTH",
        total_len: 4,
        fields: &[FieldDescriptor::uint("a", 0, 3)],
    };

    #[test]
    fn validate_catches_layout_mistakes() {
        assert_eq!(GOOD.validate(), Ok(()));
        assert!(matches!(
            OUT_OF_BOUNDS.validate(),
            Err(SchemaError::FieldOutOfBounds { field: "a", end: 4, total: 3, .. })
        ));
        assert!(matches!(
            OVERLAPPING.validate(),
            Err(SchemaError::FieldOverlap { first: "a", second: "b", .. })
        ));
        assert!(matches!(
            BAD_WIDTH.validate(),
            Err(SchemaError::BadWidth { field: "a", len: 3, .. })
        ));
    }

    #[test]
    fn transform_round_trips() {
        let t = Transform { scale: 0.01, offset: -50.0 };
        assert_eq!(t.apply(0.0), -50.0);
        assert_eq!(t.apply(7150.0), 21.5);
        assert_eq!(t.invert(21.5), 7150.0);
        assert!(!t.is_identity());
        assert!(Transform { scale: 1.0, offset: 0.0 }.is_identity());
    }
}
