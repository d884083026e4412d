//! Outbound command encoding for the DEVICE_COMMAND and GDT_COMMAND
//! characteristics.
//!
//! Every device command is a fixed 8-byte payload: a 4-byte
//! little-endian command code followed by a 4-byte little-endian
//! parameter, zero-filled when the semantic parameter is narrower.
//! Some operations take several writes; those are returned as an
//! ordered [`CommandSequence`] and sequencing is the caller's job (see
//! the type docs).

use serde::Serialize;

use crate::error::EncodeError;

/// A single 8-byte payload for the DEVICE_COMMAND characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPayload(pub [u8; 8]);

impl CommandPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A command code plus its documented name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub code: u32,
}

pub const SET_FAN_SPEED: CommandSpec = CommandSpec { name: "SET_FAN_SPEED", code: 0x0000_2001 };
pub const SET_BOOST: CommandSpec = CommandSpec { name: "SET_BOOST", code: 0x0000_1002 };
pub const SET_FAN_AUTO: CommandSpec = CommandSpec { name: "SET_FAN_AUTO", code: 0x0000_2004 };
pub const SET_LIGHT_LEVEL: CommandSpec = CommandSpec { name: "SET_LIGHT_LEVEL", code: 0x0000_2005 };
pub const SET_CLOCK: CommandSpec = CommandSpec { name: "SET_CLOCK", code: 0x0000_2006 };
pub const SET_TIMEZONE: CommandSpec = CommandSpec { name: "SET_TIMEZONE", code: 0x0000_2007 };

/// Encodes one command with a raw 32-bit parameter.
pub fn encode(spec: CommandSpec, parameter: u32) -> CommandPayload {
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&spec.code.to_le_bytes());
    bytes[4..].copy_from_slice(&parameter.to_le_bytes());
    CommandPayload(bytes)
}

/// Ordered list of payloads for one device operation.
///
/// Caller contract: write the payloads strictly in order, awaiting
/// each write before issuing the next. If any write fails, abandon the
/// rest of the sequence. There is no rollback; the device stays in the
/// state established by the writes that succeeded, and the caller
/// should read the characteristic back before retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSequence(Vec<CommandPayload>);

impl CommandSequence {
    fn single(payload: CommandPayload) -> Self {
        Self(vec![payload])
    }

    pub fn payloads(&self) -> &[CommandPayload] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for CommandSequence {
    type Item = CommandPayload;
    type IntoIter = std::vec::IntoIter<CommandPayload>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Fan speed setting. Levels map to duty bytes 0/30/60/90; boost runs
/// the motor at 120.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FanSpeed {
    Off,
    Level1,
    Level2,
    Level3,
    Boost,
    Auto,
}

/// AUTO is a flag bit in the level byte used by the vendor app.
pub const FAN_AUTO_FLAG: u8 = 0x80;

impl FanSpeed {
    /// Parses a numeric fan level: 0-3, 4 for boost, or the auto flag
    /// (possibly combined with a level, auto wins). Anything else is
    /// `UnsupportedParameter`.
    pub fn from_level(level: u8) -> Result<Self, EncodeError> {
        if level & FAN_AUTO_FLAG != 0 {
            return Ok(FanSpeed::Auto);
        }
        match level {
            0 => Ok(FanSpeed::Off),
            1 => Ok(FanSpeed::Level1),
            2 => Ok(FanSpeed::Level2),
            3 => Ok(FanSpeed::Level3),
            4 => Ok(FanSpeed::Boost),
            other => Err(EncodeError::UnsupportedParameter {
                command: SET_FAN_SPEED.name,
                value: i64::from(other),
            }),
        }
    }

    /// Maps a duty byte reported in the sensor payload back to a level.
    pub fn from_duty(duty: u8) -> Option<Self> {
        match duty {
            0 => Some(FanSpeed::Off),
            30 => Some(FanSpeed::Level1),
            60 => Some(FanSpeed::Level2),
            90 => Some(FanSpeed::Level3),
            120 => Some(FanSpeed::Boost),
            _ => None,
        }
    }

    fn duty(self) -> u8 {
        match self {
            FanSpeed::Off => 0,
            FanSpeed::Level1 => 30,
            FanSpeed::Level2 => 60,
            FanSpeed::Level3 => 90,
            FanSpeed::Boost | FanSpeed::Auto => 120,
        }
    }
}

/// Light level setting, duty bytes 0/30/60/90.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LightLevel {
    Off,
    Level1,
    Level2,
    Level3,
}

impl LightLevel {
    pub fn from_level(level: u8) -> Result<Self, EncodeError> {
        match level {
            0 => Ok(LightLevel::Off),
            1 => Ok(LightLevel::Level1),
            2 => Ok(LightLevel::Level2),
            3 => Ok(LightLevel::Level3),
            other => Err(EncodeError::UnsupportedParameter {
                command: SET_LIGHT_LEVEL.name,
                value: i64::from(other),
            }),
        }
    }

    fn duty(self) -> u8 {
        match self {
            LightLevel::Off => 0,
            LightLevel::Level1 => 30,
            LightLevel::Level2 => 60,
            LightLevel::Level3 => 90,
        }
    }
}

/// Builds the write sequence for a fan speed change.
///
/// Boost is the documented two-write case: the speed must be set to
/// 120 first, then the boost flag engaged. If the second write never
/// lands, the hood runs at speed 120 without boost; the sequence is
/// not atomic.
pub fn set_fan_speed(speed: FanSpeed) -> CommandSequence {
    match speed {
        FanSpeed::Auto => CommandSequence::single(encode(SET_FAN_AUTO, 0x02)),
        FanSpeed::Boost => CommandSequence(vec![
            encode(SET_FAN_SPEED, u32::from(FanSpeed::Boost.duty())),
            encode(SET_BOOST, u32::from(FanSpeed::Boost.duty())),
        ]),
        level => CommandSequence::single(encode(SET_FAN_SPEED, u32::from(level.duty()))),
    }
}

pub fn set_light_level(level: LightLevel) -> CommandSequence {
    CommandSequence::single(encode(SET_LIGHT_LEVEL, u32::from(level.duty())))
}

/// Sets the device clock to unix seconds.
pub fn set_clock(unix_seconds: u32) -> CommandSequence {
    CommandSequence::single(encode(SET_CLOCK, unix_seconds))
}

/// Largest UTC offset a timezone can carry, in seconds (UTC+14).
const MAX_TZ_OFFSET_SECONDS: i32 = 14 * 3600;

/// Sets the timezone as a signed UTC offset in seconds, encoded as
/// 32-bit two's complement.
pub fn set_timezone(offset_seconds: i32) -> Result<CommandSequence, EncodeError> {
    if offset_seconds.abs() > MAX_TZ_OFFSET_SECONDS {
        return Err(EncodeError::UnsupportedParameter {
            command: SET_TIMEZONE.name,
            value: i64::from(offset_seconds),
        });
    }
    Ok(CommandSequence::single(encode(
        SET_TIMEZONE,
        offset_seconds as u32,
    )))
}

/// Builds a GDT command: a 4-byte code followed by an opaque parameter
/// blob.
///
/// Observed GDT parameters are 4 to 6 bytes wide and their internal
/// structure is not understood; the blob is passed through verbatim
/// and other widths are rejected rather than padded.
pub fn encode_gdt(code: u32, parameter: &[u8]) -> Result<Vec<u8>, EncodeError> {
    if !(4..=6).contains(&parameter.len()) {
        return Err(EncodeError::UnsupportedParameter {
            command: "GDT",
            value: parameter.len() as i64,
        });
    }
    let mut bytes = Vec::with_capacity(4 + parameter.len());
    bytes.extend_from_slice(&code.to_le_bytes());
    bytes.extend_from_slice(parameter);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_level_payload_bytes() {
        let seq = set_fan_speed(FanSpeed::Level3);
        assert_eq!(seq.len(), 1);
        assert_eq!(
            seq.payloads()[0].as_bytes(),
            &[0x01, 0x20, 0x00, 0x00, 0x5A, 0x00, 0x00, 0x00]
        );

        let seq = set_fan_speed(FanSpeed::Off);
        assert_eq!(
            seq.payloads()[0].as_bytes(),
            &[0x01, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn auto_payload_bytes() {
        let seq = set_fan_speed(FanSpeed::Auto);
        assert_eq!(
            seq.payloads()[0].as_bytes(),
            &[0x04, 0x20, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn boost_is_an_ordered_two_write_sequence() {
        let seq = set_fan_speed(FanSpeed::Boost);
        assert_eq!(seq.len(), 2);
        assert_eq!(
            seq.payloads()[0].as_bytes(),
            &[0x01, 0x20, 0x00, 0x00, 0x78, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            seq.payloads()[1].as_bytes(),
            &[0x02, 0x10, 0x00, 0x00, 0x78, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn boost_sequence_is_not_atomic() {
        // A writer that fails after the first payload leaves the fan
        // at duty 120 with boost never engaged; nothing rolls back.
        let seq = set_fan_speed(FanSpeed::Boost);
        let mut fan_duty = 0u8;
        let mut boost_engaged = false;
        let mut wrote = 0;
        for payload in seq {
            if wrote == 1 {
                break; // simulated transport failure
            }
            let bytes = payload.as_bytes();
            let code = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            match code {
                c if c == SET_FAN_SPEED.code => fan_duty = bytes[4],
                c if c == SET_BOOST.code => boost_engaged = true,
                _ => {}
            }
            wrote += 1;
        }
        assert_eq!(fan_duty, 120);
        assert!(!boost_engaged);
    }

    #[test]
    fn light_payload_bytes() {
        let seq = set_light_level(LightLevel::Level2);
        assert_eq!(
            seq.payloads()[0].as_bytes(),
            &[0x05, 0x20, 0x00, 0x00, 0x3C, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn levels_outside_the_documented_range_are_rejected() {
        assert!(matches!(
            FanSpeed::from_level(7),
            Err(EncodeError::UnsupportedParameter { command: "SET_FAN_SPEED", value: 7 })
        ));
        assert_eq!(FanSpeed::from_level(4), Ok(FanSpeed::Boost));
        assert_eq!(FanSpeed::from_level(FAN_AUTO_FLAG), Ok(FanSpeed::Auto));
        assert_eq!(FanSpeed::from_level(FAN_AUTO_FLAG | 2), Ok(FanSpeed::Auto));
        assert!(LightLevel::from_level(4).is_err());
    }

    #[test]
    fn duty_mapping_round_trips() {
        for speed in [FanSpeed::Off, FanSpeed::Level1, FanSpeed::Level2, FanSpeed::Level3, FanSpeed::Boost] {
            assert_eq!(FanSpeed::from_duty(speed.duty()), Some(speed));
        }
        assert_eq!(FanSpeed::from_duty(77), None);
    }

    #[test]
    fn clock_and_timezone_parameters() {
        let seq = set_clock(1_700_000_000);
        let bytes = seq.payloads()[0].as_bytes();
        assert_eq!(&bytes[..4], &0x2006u32.to_le_bytes());
        assert_eq!(&bytes[4..], &1_700_000_000u32.to_le_bytes());

        let seq = set_timezone(-3600).unwrap();
        let bytes = seq.payloads()[0].as_bytes();
        assert_eq!(&bytes[4..], &(-3600i32).to_le_bytes());

        assert!(matches!(
            set_timezone(15 * 3600),
            Err(EncodeError::UnsupportedParameter { command: "SET_TIMEZONE", .. })
        ));
    }

    #[test]
    fn gdt_parameter_width_is_bounded() {
        let bytes = encode_gdt(0x0000_3001, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(bytes.len(), 9);
        assert_eq!(&bytes[..4], &[0x01, 0x30, 0x00, 0x00]);
        assert_eq!(&bytes[4..], &[1, 2, 3, 4, 5]);

        assert!(encode_gdt(0x0000_3001, &[1, 2, 3]).is_err());
        assert!(encode_gdt(0x0000_3001, &[0; 7]).is_err());
    }
}
