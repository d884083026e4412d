//! Error types for the codec seams: decode, encode, routing, schema checks.
//!
//! Nothing here is retried internally. The codec is synchronous and
//! stateless, so recovery is always the caller's call: re-issue a read,
//! wait for the next notification, or fix the parameter.

use serde::Serialize;
use uuid::Uuid;

/// A notification or read payload could not be decoded.
///
/// A failed decode never corrupts other decodes; schemas are immutable
/// and every call works on its own buffer.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
pub enum DecodeError {
    /// The payload length disagrees with the schema. Fatal for this
    /// decode call; there is no best-effort partial parse.
    #[error("{schema} payload is {actual} bytes, expected {expected}")]
    LengthMismatch {
        schema: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A field's bytes could not be interpreted (for example a string
    /// field holding invalid UTF-8). Unrecognized enum values and
    /// bitfield bits are *not* errors; they are preserved as raw
    /// integers for forward compatibility.
    #[error("malformed field {field} in {schema}: {reason}")]
    MalformedField {
        schema: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// A command or record could not be encoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    /// The parameter is outside the range the target command is
    /// documented to accept. Surfaced, never silently clamped.
    #[error("unsupported parameter {value} for {command}")]
    UnsupportedParameter {
        command: &'static str,
        value: i64,
    },

    /// Re-encoding a record requires a value for every schema field.
    #[error("record for {schema} is missing field {field}")]
    MissingField {
        schema: &'static str,
        field: &'static str,
    },

    /// The supplied value does not fit the field it targets.
    #[error("value for {field} in {schema} does not fit: {reason}")]
    ValueMismatch {
        schema: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// A notification arrived for a characteristic the binding table does
/// not know.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    /// Forward-compatibility signal: new firmware may expose new
    /// handles. Recoverable; the caller may log and move on.
    #[error("unknown characteristic {uuid}")]
    UnknownCharacteristic { uuid: Uuid },
}

/// A statically declared schema is internally inconsistent.
///
/// Schemas are built once at process start; these errors are asserted
/// away by the schema validation tests rather than checked per decode.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("field {field} in {schema} ends at byte {end}, past record length {total}")]
    FieldOutOfBounds {
        schema: &'static str,
        field: &'static str,
        end: usize,
        total: usize,
    },

    #[error("fields {first} and {second} in {schema} overlap")]
    FieldOverlap {
        schema: &'static str,
        first: &'static str,
        second: &'static str,
    },

    #[error("field {field} in {schema} has unsupported width {len} for its kind")]
    BadWidth {
        schema: &'static str,
        field: &'static str,
        len: usize,
    },

    #[error("repeating schema {schema} names count field {field}, absent from its header")]
    MissingCountField {
        schema: &'static str,
        field: &'static str,
    },
}
