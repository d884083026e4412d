//! Safera Sense wire protocol - payload schemas, decoders and commands
//!
//! Pure codec crate: no transport here. The BLE client in `safera-ble`
//! hands raw characteristic payloads to [`NotificationRouter::route`]
//! and writes the payloads produced by the `command` encoders.

mod decode;
mod error;
mod records;
mod router;
mod schema;
mod value;

pub mod command;
pub mod uuids;

pub use decode::{decode, decode_repeating, encode_record, Entries};
pub use error::{DecodeError, EncodeError, RouteError, SchemaError};
pub use records::{
    CAPABILITY_BITS, DCV_REPORT, DEVICE_STATES, EVENT_LOG, NETWORK_SETTINGS, SENSOR_ERROR_BITS,
    SENSOR_REPORT, SENSOR_REPORT_EX,
};
pub use router::{
    BindingKind, CharacteristicBinding, Direction, EventBody, NotificationRouter,
    SubscriptionState, TypedEvent, BINDINGS,
};
pub use schema::{FieldDescriptor, FieldKind, RecordSchema, RepeatingSchema, Transform};
pub use value::{DecodedRecord, Value};
