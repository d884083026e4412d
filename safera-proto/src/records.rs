//! Static payload schemas for the Safera Sense characteristics.
//!
//! Byte offsets, widths and scale factors reproduce the captured
//! protocol exactly; see `docs/PROTOCOL.md` for the annotated tables.
//! Fields marked reserved or "not understood" are surfaced opaquely
//! rather than interpreted.

use crate::schema::{FieldDescriptor, RecordSchema, RepeatingSchema};

/// Sensor error flags, bit position to meaning (sensor_errors field).
pub const SENSOR_ERROR_BITS: &[(u32, &str)] = &[
    (0, "Temp Sensor"),
    (1, "TOF Sensor"),
    (2, "ADC Sensor"),
    (3, "Gas Sensor A"),
    (4, "Gas Sensor B"),
    (5, "Particle Sensor"),
    (6, "Orientation Sensor"),
    (7, "Humidity Sensor"),
    (8, "Orientation"),
    (9, "Battery Low"),
    (10, "Paired PCU missing"),
    (11, "Processor Error"),
    (12, "Sensor Lens Dirty"),
    (13, "Battery Critically Low"),
    (14, "External Memory"),
    (15, "IO Expander"),
];

/// device_state values. Unknown states decode as their raw byte.
pub const DEVICE_STATES: &[(u64, &str)] = &[
    (0, "NONE"),
    (1, "COOKING"),
    (2, "ALARM_PRE_WARNING"),
    (3, "ALARM"),
    (4, "COOLDOWN"),
];

/// Capability flags in NETWORK_SETTINGS. Bit 8 has been observed set
/// on some units but is not understood; it surfaces in the residual.
pub const CAPABILITY_BITS: &[(u32, &str)] = &[
    (0, "WIFI"),
    (1, "CLOUD"),
    (2, "PCU_LINK"),
    (3, "DCV"),
];

macro_rules! sensor_report_fields {
    ($($extra:expr),* $(,)?) => {
        &[
            FieldDescriptor::scaled("ambient_temperature", 0, 2, 0.01, -50.0),
            FieldDescriptor::scaled("surface_temperature", 2, 2, 0.01, -50.0),
            FieldDescriptor::scaled("humidity", 4, 2, 0.01, 0.0),
            FieldDescriptor::scaled("ambient_light", 6, 2, 0.031_25, 0.0),
            FieldDescriptor::uint("mounting_height", 8, 1),
            FieldDescriptor::uint("emf", 9, 1),
            FieldDescriptor::uint("air_quality_index", 10, 2),
            FieldDescriptor::scaled("particle_index", 12, 2, 0.2, 0.0),
            FieldDescriptor::scaled("voc_uba", 14, 1, 0.05, 0.0),
            FieldDescriptor::uint("co2_ppm", 15, 2),
            FieldDescriptor::uint("tvoc_ppb", 17, 2),
            // Not understood; decoded without interpretation.
            FieldDescriptor::uint("miu_status", 19, 4),
            FieldDescriptor::uint("voc_status", 23, 1),
            FieldDescriptor::scaled("heat_index", 24, 1, 2.0, 0.0),
            FieldDescriptor::uint("connected_accessories", 25, 1),
            FieldDescriptor::uint("battery_level", 26, 1),
            FieldDescriptor::uint("seconds_since_ok_press", 27, 1),
            // 0x01 while alarming; countdown codes otherwise.
            FieldDescriptor::boolean("alarm_status", 28),
            FieldDescriptor::int("tilt_angle", 29, 2),
            FieldDescriptor::int("pitch_angle", 31, 2),
            FieldDescriptor::enumeration("device_state", 33, DEVICE_STATES),
            FieldDescriptor::bitfield("sensor_errors", 34, 2, SENSOR_ERROR_BITS),
            FieldDescriptor::uint("device_clock", 36, 4),
            FieldDescriptor::uint("pcu_errors", 40, 2),
            FieldDescriptor::reserved("reserved_42", 42, 1),
            FieldDescriptor::uint("activity_type", 43, 1),
            FieldDescriptor::uint("alarm_level", 44, 1),
            FieldDescriptor::uint("activity_level", 45, 1),
            FieldDescriptor::uint("power_consumption", 46, 2),
            FieldDescriptor::reserved("reserved_48", 48, 2),
            FieldDescriptor::uint("blec_command", 50, 1),
            FieldDescriptor::int("pcu_lqi", 51, 1),
            FieldDescriptor::uint("pcu_ed", 52, 1),
            // 0/30/60/90 = level 0-3, 100 = auto.
            FieldDescriptor::uint("light_brightness", 53, 1),
            $($extra,)*
        ]
    };
}

/// Base 54-byte sensor report (characteristic `0000beef`).
pub static SENSOR_REPORT: RecordSchema = RecordSchema {
    name: "SENSOR_REPORT",
    total_len: 54,
    fields: sensor_report_fields![],
};

/// Extended 68-byte sensor report sent by hood-connected firmware.
/// Identical to [`SENSOR_REPORT`] with a fan/light tail.
pub static SENSOR_REPORT_EX: RecordSchema = RecordSchema {
    name: "SENSOR_REPORT_EX",
    total_len: 68,
    fields: sensor_report_fields![
        FieldDescriptor::reserved("reserved_54", 54, 6),
        // 0/30/60/90/120 = level 0-3 plus boost.
        FieldDescriptor::uint("fan_speed", 60, 1),
        FieldDescriptor::reserved("reserved_61", 61, 2),
        // 30 while the fan is in auto mode.
        FieldDescriptor::uint("fan_auto", 63, 1),
        FieldDescriptor::reserved("reserved_64", 64, 4),
    ],
};

/// Event log notification: u16 count, then 5-byte entries.
pub static EVENT_LOG: RepeatingSchema = RepeatingSchema {
    name: "EVENT_LOG",
    header: RecordSchema {
        name: "EVENT_LOG_HEADER",
        total_len: 2,
        fields: &[FieldDescriptor::uint("count", 0, 2)],
    },
    count_field: "count",
    entry: RecordSchema {
        name: "EVENT_LOG_ENTRY",
        total_len: 5,
        fields: &[
            FieldDescriptor::uint("event_id", 0, 1),
            FieldDescriptor::uint("timestamp", 1, 4),
        ],
    },
};

/// Demand-controlled ventilation history: u16 count, 6-byte entries.
pub static DCV_REPORT: RepeatingSchema = RepeatingSchema {
    name: "DCV_REPORT",
    header: RecordSchema {
        name: "DCV_REPORT_HEADER",
        total_len: 2,
        fields: &[FieldDescriptor::uint("count", 0, 2)],
    },
    count_field: "count",
    entry: RecordSchema {
        name: "DCV_REPORT_ENTRY",
        total_len: 6,
        fields: &[
            FieldDescriptor::uint("timestamp", 0, 4),
            FieldDescriptor::uint("fan_speed", 4, 1),
            FieldDescriptor::uint("activity_level", 5, 1),
        ],
    },
};

/// Network settings record (characteristic `0000abd1`, read/write).
/// Writing it back must round-trip losslessly, hence the reserved byte.
pub static NETWORK_SETTINGS: RecordSchema = RecordSchema {
    name: "NETWORK_SETTINGS",
    total_len: 64,
    fields: &[
        FieldDescriptor::string("ssid", 0, 32),
        FieldDescriptor::string("hostname", 32, 16),
        // The documented endianness exception: byte-reversed IPv4.
        FieldDescriptor::ipv4("ip_address", 48),
        FieldDescriptor::int("wifi_rssi", 52, 1),
        FieldDescriptor::reserved("reserved_53", 53, 1),
        FieldDescriptor::bitfield("capabilities", 54, 2, CAPABILITY_BITS),
        FieldDescriptor::string_term("version", 56, 8, 0x0a),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::value::Value;

    #[test]
    fn static_schemas_are_consistent() {
        for schema in [&SENSOR_REPORT, &SENSOR_REPORT_EX, &NETWORK_SETTINGS] {
            schema.validate().unwrap_or_else(|e| panic!("{e}"));
        }
        for schema in [&EVENT_LOG, &DCV_REPORT] {
            schema.validate().unwrap_or_else(|e| panic!("{e}"));
        }
        assert_eq!(SENSOR_REPORT.total_len, 54);
        assert_eq!(SENSOR_REPORT_EX.total_len, 68);
        assert_eq!(EVENT_LOG.stride(), 5);
        assert_eq!(DCV_REPORT.stride(), 6);
    }

    #[test]
    fn sensor_report_covers_every_byte() {
        // Contiguous coverage: with validate() guaranteeing bounds and
        // non-overlap, a width sum equal to the record length means no
        // byte was forgotten.
        for schema in [&SENSOR_REPORT, &SENSOR_REPORT_EX, &NETWORK_SETTINGS] {
            let sum: usize = schema.fields.iter().map(|f| f.len).sum();
            assert_eq!(sum, schema.total_len, "gap in {}", schema.name);
        }
    }

    #[test]
    fn all_zero_report_decodes_to_baseline_values() {
        let record = decode(&SENSOR_REPORT, &[0u8; 54]).unwrap();
        assert_eq!(record.get("ambient_temperature"), Some(&Value::Float(-50.0)));
        assert_eq!(record.get("humidity"), Some(&Value::Float(0.0)));
        assert_eq!(
            record.get("device_state"),
            Some(&Value::Enum { raw: 0, tag: Some("NONE") })
        );
        assert_eq!(record.get("alarm_status"), Some(&Value::UInt(0)));
    }

    #[test]
    fn realistic_report_decodes() {
        let mut bytes = [0u8; 68];
        bytes[0..2].copy_from_slice(&7150u16.to_le_bytes()); // 21.5 C
        bytes[2..4].copy_from_slice(&12_000u16.to_le_bytes()); // 70.0 C surface
        bytes[4..6].copy_from_slice(&4550u16.to_le_bytes()); // 45.5 %
        bytes[15..17].copy_from_slice(&600u16.to_le_bytes()); // CO2 ppm
        bytes[26] = 87; // battery
        bytes[28] = 0x01; // alarming
        bytes[29..31].copy_from_slice(&(-3i16).to_le_bytes());
        bytes[33] = 3; // ALARM
        bytes[34..36].copy_from_slice(&0x1001u16.to_le_bytes());
        bytes[51] = 0xfb; // lqi -5
        bytes[60] = 90; // fan level 3
        bytes[63] = 30; // fan auto

        let record = decode(&SENSOR_REPORT_EX, &bytes).unwrap();
        assert_eq!(record.get("ambient_temperature"), Some(&Value::Float(21.5)));
        assert_eq!(record.get("surface_temperature"), Some(&Value::Float(70.0)));
        assert_eq!(record.get("humidity"), Some(&Value::Float(45.5)));
        assert_eq!(record.get("co2_ppm"), Some(&Value::UInt(600)));
        assert_eq!(record.get("battery_level"), Some(&Value::UInt(87)));
        assert_eq!(record.get("alarm_status"), Some(&Value::Bool(true)));
        assert_eq!(record.get("tilt_angle"), Some(&Value::Int(-3)));
        assert_eq!(
            record.get("device_state"),
            Some(&Value::Enum { raw: 3, tag: Some("ALARM") })
        );
        assert_eq!(
            record.get("sensor_errors"),
            Some(&Value::Bits {
                raw: 0x1001,
                tags: vec!["Temp Sensor", "Sensor Lens Dirty"],
                residual: 0,
            })
        );
        assert_eq!(record.get("pcu_lqi"), Some(&Value::Int(-5)));
        assert_eq!(record.get("fan_speed"), Some(&Value::UInt(90)));
        assert_eq!(record.get("fan_auto"), Some(&Value::UInt(30)));
    }

    #[test]
    fn capability_bit_8_lands_in_the_residual() {
        let mut bytes = [0u8; 64];
        bytes[54..56].copy_from_slice(&0x0101u16.to_le_bytes());
        let record = decode(&NETWORK_SETTINGS, &bytes).unwrap();
        assert_eq!(
            record.get("capabilities"),
            Some(&Value::Bits { raw: 0x0101, tags: vec!["WIFI"], residual: 0x0100 })
        );
    }
}
