//! Characteristic bindings and the notification router.
//!
//! The binding table is static and read-only; the router adds a small
//! per-characteristic subscription state machine driven by externally
//! signaled transport events (subscription confirmed, unsubscribe,
//! connection loss). Decoding itself never looks at that state, so the
//! router can be invoked concurrently for unrelated characteristics.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;
use uuid::Uuid;

use crate::decode::{decode, decode_repeating};
use crate::error::{DecodeError, RouteError};
use crate::records;
use crate::schema::{RecordSchema, RepeatingSchema};
use crate::uuids;
use crate::value::DecodedRecord;

/// GATT operations a characteristic supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Read,
    Write,
    Notify,
}

/// What a characteristic's payload decodes into.
#[derive(Debug)]
pub enum BindingKind {
    /// Fixed-size record. Several length variants may be bound (the
    /// sensor report has a 54-byte base and a 68-byte extended form);
    /// the payload length selects the variant.
    Fixed(&'static [&'static RecordSchema]),
    /// Count-prefixed repeating payload.
    Repeating(&'static RepeatingSchema),
    /// Plain UTF-8 text (Device Information strings).
    Utf8Text,
    /// Write-only command channel; never routed.
    Command,
}

/// One row of the characteristic directory.
#[derive(Debug)]
pub struct CharacteristicBinding {
    pub uuid: Uuid,
    pub name: &'static str,
    /// GATT handle observed during discovery, where captured.
    pub handle: Option<u16>,
    pub directions: &'static [Direction],
    pub kind: BindingKind,
}

use Direction::{Notify, Read, Write};

/// Static characteristic directory, built once and shared read-only.
pub static BINDINGS: &[CharacteristicBinding] = &[
    CharacteristicBinding {
        uuid: uuids::MANUFACTURER,
        name: "MANUFACTURER",
        handle: Some(15),
        directions: &[Read],
        kind: BindingKind::Utf8Text,
    },
    CharacteristicBinding {
        uuid: uuids::MODEL_NUMBER,
        name: "MODEL_NUMBER",
        handle: Some(17),
        directions: &[Read],
        kind: BindingKind::Utf8Text,
    },
    CharacteristicBinding {
        uuid: uuids::SERIAL_NUMBER,
        name: "SERIAL_NUMBER",
        handle: Some(19),
        directions: &[Read],
        kind: BindingKind::Utf8Text,
    },
    CharacteristicBinding {
        uuid: uuids::HARDWARE_REV,
        name: "HARDWARE_REV",
        handle: Some(21),
        directions: &[Read],
        kind: BindingKind::Utf8Text,
    },
    CharacteristicBinding {
        uuid: uuids::FIRMWARE_REV,
        name: "FIRMWARE_REV",
        handle: Some(23),
        directions: &[Read],
        kind: BindingKind::Utf8Text,
    },
    CharacteristicBinding {
        uuid: uuids::SOFTWARE_REV,
        name: "SOFTWARE_REV",
        handle: Some(25),
        directions: &[Read],
        kind: BindingKind::Utf8Text,
    },
    CharacteristicBinding {
        uuid: uuids::SENSOR_REPORT,
        name: "SENSOR_REPORT",
        handle: Some(32),
        directions: &[Read, Notify],
        kind: BindingKind::Fixed(&[&records::SENSOR_REPORT, &records::SENSOR_REPORT_EX]),
    },
    CharacteristicBinding {
        uuid: uuids::GDT_COMMAND,
        name: "GDT_COMMAND",
        handle: Some(35),
        directions: &[Write],
        kind: BindingKind::Command,
    },
    CharacteristicBinding {
        uuid: uuids::DEVICE_COMMAND,
        name: "DEVICE_COMMAND",
        handle: None,
        directions: &[Write],
        kind: BindingKind::Command,
    },
    CharacteristicBinding {
        uuid: uuids::NETWORK_SETTINGS,
        name: "NETWORK_SETTINGS",
        handle: Some(55),
        directions: &[Read, Write],
        kind: BindingKind::Fixed(&[&records::NETWORK_SETTINGS]),
    },
    CharacteristicBinding {
        uuid: uuids::EVENT_LOG,
        name: "EVENT_LOG",
        handle: None,
        directions: &[Notify],
        kind: BindingKind::Repeating(&records::EVENT_LOG),
    },
    CharacteristicBinding {
        uuid: uuids::DCV_REPORT,
        name: "DCV_REPORT",
        handle: None,
        directions: &[Notify],
        kind: BindingKind::Repeating(&records::DCV_REPORT),
    },
];

/// Decoded body of a routed notification or read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EventBody {
    Record(DecodedRecord),
    Entries(Vec<DecodedRecord>),
    Text(String),
}

/// A routed payload, tagged with the characteristic it came from so a
/// single consumer can tell multiplexed notifications apart.
///
/// Decode failures ride inside the event; only an unknown
/// characteristic fails the `route` call itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedEvent {
    pub uuid: Uuid,
    pub characteristic: &'static str,
    pub body: Result<EventBody, DecodeError>,
}

/// Per-characteristic subscription state, driven by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribed,
}

/// Maps incoming characteristic payloads to typed events.
///
/// Safe to share across notification-handling tasks: the binding table
/// is immutable and the subscription map sits behind a lock that is
/// only touched by the explicit state-transition calls.
#[derive(Debug)]
pub struct NotificationRouter {
    bindings: &'static [CharacteristicBinding],
    subscriptions: RwLock<HashMap<Uuid, SubscriptionState>>,
}

impl NotificationRouter {
    pub fn new() -> Self {
        Self::with_bindings(BINDINGS)
    }

    pub fn with_bindings(bindings: &'static [CharacteristicBinding]) -> Self {
        Self {
            bindings,
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    pub fn binding(&self, uuid: Uuid) -> Option<&'static CharacteristicBinding> {
        self.bindings.iter().find(|b| b.uuid == uuid)
    }

    fn known(&self, uuid: Uuid) -> Result<&'static CharacteristicBinding, RouteError> {
        self.binding(uuid)
            .ok_or(RouteError::UnknownCharacteristic { uuid })
    }

    /// Called when the transport confirms a subscription.
    pub fn confirm_subscribed(&self, uuid: Uuid) -> Result<(), RouteError> {
        self.known(uuid)?;
        self.subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uuid, SubscriptionState::Subscribed);
        Ok(())
    }

    /// Called on explicit unsubscribe.
    pub fn mark_unsubscribed(&self, uuid: Uuid) -> Result<(), RouteError> {
        self.known(uuid)?;
        self.subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uuid, SubscriptionState::Unsubscribed);
        Ok(())
    }

    /// Called when the transport signals connection loss; every
    /// characteristic drops back to Unsubscribed.
    pub fn connection_lost(&self) {
        self.subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn subscription(&self, uuid: Uuid) -> SubscriptionState {
        self.subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&uuid)
            .copied()
            .unwrap_or(SubscriptionState::Unsubscribed)
    }

    pub fn is_subscribed(&self, uuid: Uuid) -> bool {
        self.subscription(uuid) == SubscriptionState::Subscribed
    }

    /// Routes a raw payload to its decoder.
    ///
    /// Decoding ignores subscription state: a notification may race an
    /// unsubscribe and is still worth decoding. Write-only command
    /// channels have no decoder and report a length mismatch against
    /// an empty record.
    pub fn route(&self, uuid: Uuid, bytes: &[u8]) -> Result<TypedEvent, RouteError> {
        let binding = self.known(uuid)?;
        let body = match &binding.kind {
            BindingKind::Fixed(variants) => match variants
                .iter()
                .find(|schema| schema.total_len == bytes.len())
            {
                Some(schema) => decode(schema, bytes).map(EventBody::Record),
                // No variant matches; report against the primary form.
                None => Err(DecodeError::LengthMismatch {
                    schema: variants[0].name,
                    expected: variants[0].total_len,
                    actual: bytes.len(),
                }),
            },
            BindingKind::Repeating(schema) => decode_repeating(schema, bytes)
                .and_then(|entries| entries.collect::<Result<Vec<_>, _>>())
                .map(EventBody::Entries),
            BindingKind::Utf8Text => Ok(EventBody::Text(
                String::from_utf8_lossy(bytes)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string(),
            )),
            BindingKind::Command => Err(DecodeError::MalformedField {
                schema: binding.name,
                field: "payload",
                reason: "write-only command characteristic does not notify".to_string(),
            }),
        };
        Ok(TypedEvent {
            uuid,
            characteristic: binding.name,
            body,
        })
    }
}

impl Default for NotificationRouter {
    fn default() -> Self {
        Self::new()
    }
}
