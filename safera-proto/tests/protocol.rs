//! End-to-end protocol tests against captured-style payloads.

use std::net::Ipv4Addr;

use safera_proto::{
    command::{self, FanSpeed, LightLevel},
    decode, decode_repeating, encode_record, uuids, DecodeError, EventBody, NotificationRouter,
    RouteError, Value, EVENT_LOG, NETWORK_SETTINGS, SENSOR_REPORT,
};
use uuid::Uuid;

#[test]
fn all_zero_sensor_report_hits_scale_baselines() {
    let record = decode(&SENSOR_REPORT, &[0u8; 54]).unwrap();
    assert_eq!(record.get("ambient_temperature"), Some(&Value::Float(-50.0)));
    assert_eq!(record.get("surface_temperature"), Some(&Value::Float(-50.0)));
    assert_eq!(record.get("humidity"), Some(&Value::Float(0.0)));
    assert_eq!(record.get("battery_level"), Some(&Value::UInt(0)));
    // Byte 0x00 is not the documented true byte, so the raw code is kept.
    assert_eq!(record.get("alarm_status"), Some(&Value::UInt(0)));
}

#[test]
fn truncated_and_oversized_sensor_payloads_are_rejected() {
    for len in [0usize, 10, 53, 55] {
        let err = decode(&SENSOR_REPORT, &vec![0u8; len]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::LengthMismatch { schema: "SENSOR_REPORT", expected: 54, actual: len }
        );
    }
}

#[test]
fn event_log_length_arithmetic() {
    // Two entries: 2-byte header plus 2 * 5 bytes.
    let mut payload = vec![0x02, 0x00];
    payload.extend_from_slice(&[0x07, 0x10, 0x32, 0x54, 0x68]);
    payload.extend_from_slice(&[0x09, 0x11, 0x32, 0x54, 0x68]);
    let entries = decode_repeating(&EVENT_LOG, &payload).unwrap();
    assert_eq!(entries.count(), 2);
    let entries: Vec<_> = entries.map(Result::unwrap).collect();
    assert_eq!(entries[0].get("event_id"), Some(&Value::UInt(0x07)));
    assert_eq!(entries[0].get("timestamp"), Some(&Value::UInt(0x68543210)));
    assert_eq!(entries[1].get("event_id"), Some(&Value::UInt(0x09)));

    // Count says two but only one entry is present.
    let short = &payload[..7];
    assert_eq!(
        decode_repeating(&EVENT_LOG, short).unwrap_err(),
        DecodeError::LengthMismatch { schema: "EVENT_LOG", expected: 12, actual: 7 }
    );

    // Trailing garbage after the last entry.
    let mut long = payload.clone();
    long.push(0xff);
    assert_eq!(
        decode_repeating(&EVENT_LOG, &long).unwrap_err(),
        DecodeError::LengthMismatch { schema: "EVENT_LOG", expected: 12, actual: 13 }
    );

    // Empty log: header only, zero entries.
    let entries = decode_repeating(&EVENT_LOG, &[0x00, 0x00]).unwrap();
    assert_eq!(entries.count(), 0);
    assert_eq!(entries.collect::<Vec<_>>().len(), 0);
}

#[test]
fn entries_iterator_is_restartable() {
    let mut payload = vec![0x03, 0x00];
    for id in 1u8..=3 {
        payload.push(id);
        payload.extend_from_slice(&u32::from(id).to_le_bytes());
    }
    let mut entries = decode_repeating(&EVENT_LOG, &payload).unwrap();
    let first = entries.next().unwrap().unwrap();
    assert_eq!(first.get("event_id"), Some(&Value::UInt(1)));

    let again: Vec<_> = entries.restart().map(Result::unwrap).collect();
    assert_eq!(again.len(), 3);
    assert_eq!(again[0].get("event_id"), Some(&Value::UInt(1)));
    assert_eq!(again[2].get("event_id"), Some(&Value::UInt(3)));
}

#[test]
fn network_settings_round_trip_is_byte_identical() {
    let mut bytes = [0u8; 64];
    bytes[..12].copy_from_slice(b"kitchen-wifi");
    bytes[32..41].copy_from_slice(b"safera-01");
    bytes[48..52].copy_from_slice(&[0x01, 0x00, 0xA8, 0xC0]);
    bytes[52] = (-61i8) as u8;
    bytes[53] = 0x7e; // reserved, must survive untouched
    bytes[54..56].copy_from_slice(&0x0109u16.to_le_bytes());
    bytes[56..62].copy_from_slice(b"4.1.12");
    bytes[62] = 0x0a;

    let record = decode(&NETWORK_SETTINGS, &bytes).unwrap();
    assert_eq!(record.get("ssid"), Some(&Value::Text("kitchen-wifi".into())));
    assert_eq!(record.get("hostname"), Some(&Value::Text("safera-01".into())));
    assert_eq!(
        record.get("ip_address"),
        Some(&Value::Ipv4(Ipv4Addr::new(192, 168, 0, 1)))
    );
    assert_eq!(record.get("wifi_rssi"), Some(&Value::Int(-61)));
    assert_eq!(
        record.get("capabilities"),
        Some(&Value::Bits {
            raw: 0x0109,
            tags: vec!["WIFI", "DCV"],
            residual: 0x0100,
        })
    );
    assert_eq!(record.get("version"), Some(&Value::Text("4.1.12".into())));

    let encoded = encode_record(&NETWORK_SETTINGS, &record).unwrap();
    assert_eq!(encoded, bytes);
}

#[test]
fn modified_settings_record_re_encodes() {
    let mut bytes = [0u8; 64];
    bytes[..4].copy_from_slice(b"home");
    bytes[62] = 0x0a;
    let mut record = decode(&NETWORK_SETTINGS, &bytes).unwrap();

    record.set("ssid", Value::Text("garage".into()));
    record.set("ip_address", Value::Ipv4(Ipv4Addr::new(10, 0, 0, 7)));

    let encoded = encode_record(&NETWORK_SETTINGS, &record).unwrap();
    assert_eq!(&encoded[..6], b"garage");
    assert_eq!(encoded[6], 0);
    // Reversed on the wire.
    assert_eq!(&encoded[48..52], &[0x07, 0x00, 0x00, 0x0a]);
}

#[test]
fn router_dispatches_by_characteristic() {
    let router = NotificationRouter::new();

    let event = router.route(uuids::SENSOR_REPORT, &[0u8; 54]).unwrap();
    assert!(matches!(event.body, Ok(EventBody::Record(_))));

    let event = router.route(uuids::EVENT_LOG, &[0x00, 0x00]).unwrap();
    assert_eq!(event.body, Ok(EventBody::Entries(Vec::new())));

    let stranger = Uuid::from_u128(0x0000cafe_1212_efde_1523_785fef13d123);
    assert_eq!(
        router.route(stranger, &[0u8; 54]),
        Err(RouteError::UnknownCharacteristic { uuid: stranger })
    );
    // The failure is recoverable; routing keeps working afterwards.
    assert!(router.route(uuids::SENSOR_REPORT, &[0u8; 68]).is_ok());
}

#[test]
fn command_byte_vectors_match_captures() {
    let fan = command::set_fan_speed(FanSpeed::Level1);
    assert_eq!(fan.payloads()[0].as_bytes(), &[0x01, 0x20, 0, 0, 30, 0, 0, 0]);

    let light = command::set_light_level(LightLevel::Level3);
    assert_eq!(light.payloads()[0].as_bytes(), &[0x05, 0x20, 0, 0, 90, 0, 0, 0]);

    let boost = command::set_fan_speed(FanSpeed::Boost);
    let writes: Vec<_> = boost.payloads().iter().map(|p| p.as_bytes().to_vec()).collect();
    assert_eq!(
        writes,
        vec![
            vec![0x01, 0x20, 0x00, 0x00, 0x78, 0x00, 0x00, 0x00],
            vec![0x02, 0x10, 0x00, 0x00, 0x78, 0x00, 0x00, 0x00],
        ]
    );
}

#[test]
fn decoded_events_serialize_to_json() {
    let router = NotificationRouter::new();
    let event = router.route(uuids::SENSOR_REPORT, &[0u8; 54]).unwrap();
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["characteristic"], "SENSOR_REPORT");
    assert_eq!(json["body"]["Ok"]["Record"]["humidity"], 0.0);
}
