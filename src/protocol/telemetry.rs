//! Telemetry frame codec
//!
//! # Frame Format
//!
//! Every notification on the telemetry characteristic carries exactly one
//! 13-byte frame:
//! ```text
//! [temperature: i32 LE][humidity: i32 LE][pressure: i32 LE][switch: u8]
//! ```
//!
//! | Offset | Size | Field       | Unit                          |
//! |--------|------|-------------|-------------------------------|
//! | 0      | 4    | temperature | milli-degrees Celsius         |
//! | 4      | 4    | humidity    | hundredths of a percent RH    |
//! | 8      | 4    | pressure    | milli-pascal                  |
//! | 12     | 1    | switch      | `0x00` off, `0x01` on         |
//!
//! Numeric lanes hold the reading wrapped to 32 bits. The codec never
//! rounds or saturates.

use core::fmt;

use crate::config::protocol::TELEMETRY_FRAME_SIZE;

const TEMPERATURE_OFFSET: usize = 0;
const HUMIDITY_OFFSET: usize = 4;
const PRESSURE_OFFSET: usize = 8;
const SWITCH_OFFSET: usize = 12;

const SWITCH_OFF: u8 = 0x00;
const SWITCH_ON: u8 = 0x01;

/// Reasons a byte slice is not a telemetry frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Slice is not exactly 13 bytes long
    Length(usize),
    /// Switch byte is neither 0x00 nor 0x01
    SwitchByte(u8),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Length(len) => {
                write!(f, "expected {} bytes, got {}", TELEMETRY_FRAME_SIZE, len)
            }
            FrameError::SwitchByte(byte) => write!(f, "invalid switch byte 0x{:02x}", byte),
        }
    }
}

/// One encoded sensor + switch sample
///
/// Immutable once built; the only way to obtain one is [`TelemetryFrame::encode`]
/// or a checked [`TelemetryFrame::from_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryFrame([u8; TELEMETRY_FRAME_SIZE]);

impl TelemetryFrame {
    /// Encode one sample into a frame
    pub fn encode(temperature: i32, humidity: i32, pressure: i32, switch_on: bool) -> Self {
        let mut bytes = [0u8; TELEMETRY_FRAME_SIZE];
        bytes[TEMPERATURE_OFFSET..HUMIDITY_OFFSET].copy_from_slice(&temperature.to_le_bytes());
        bytes[HUMIDITY_OFFSET..PRESSURE_OFFSET].copy_from_slice(&humidity.to_le_bytes());
        bytes[PRESSURE_OFFSET..SWITCH_OFFSET].copy_from_slice(&pressure.to_le_bytes());
        bytes[SWITCH_OFFSET] = if switch_on { SWITCH_ON } else { SWITCH_OFF };
        Self(bytes)
    }

    /// Parse a frame received from the wire
    pub fn from_bytes(data: &[u8]) -> Result<Self, FrameError> {
        let bytes: [u8; TELEMETRY_FRAME_SIZE] = data
            .try_into()
            .map_err(|_| FrameError::Length(data.len()))?;

        match bytes[SWITCH_OFFSET] {
            SWITCH_OFF | SWITCH_ON => Ok(Self(bytes)),
            other => Err(FrameError::SwitchByte(other)),
        }
    }

    /// Raw wire bytes
    pub fn as_bytes(&self) -> &[u8; TELEMETRY_FRAME_SIZE] {
        &self.0
    }

    pub fn temperature(&self) -> i32 {
        self.lane(TEMPERATURE_OFFSET)
    }

    pub fn humidity(&self) -> i32 {
        self.lane(HUMIDITY_OFFSET)
    }

    pub fn pressure(&self) -> i32 {
        self.lane(PRESSURE_OFFSET)
    }

    pub fn switch_on(&self) -> bool {
        self.0[SWITCH_OFFSET] == SWITCH_ON
    }

    fn lane(&self, offset: usize) -> i32 {
        i32::from_le_bytes([
            self.0[offset],
            self.0[offset + 1],
            self.0[offset + 2],
            self.0[offset + 3],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_frame() {
        let frame = TelemetryFrame::encode(-500, 6000, 101_325, true);

        assert_eq!(
            frame.as_bytes(),
            &[
                0x0C, 0xFE, 0xFF, 0xFF, // -500
                0x70, 0x17, 0x00, 0x00, // 6000
                0xCD, 0x8B, 0x01, 0x00, // 101325
                0x01,
            ]
        );
    }

    #[test]
    fn test_frame_is_always_13_bytes() {
        let frame = TelemetryFrame::encode(0, 0, 0, false);
        assert_eq!(frame.as_bytes().len(), 13);
        assert_eq!(frame.as_bytes(), &[0u8; 13]);
    }

    #[test]
    fn test_lanes_decode_bytewise() {
        let samples = [
            (i32::MIN, i32::MAX, 0, false),
            (-1, 1, -1, true),
            (0x1234_5678, -0x0102_0304, 100_653_253, true),
        ];

        for &(t, h, p, s) in &samples {
            let frame = TelemetryFrame::encode(t, h, p, s);
            let bytes = frame.as_bytes();

            // Rebuild lanes by hand, byte0 = value & 0xFF and so on
            let manual = |offset: usize| {
                (bytes[offset] as u32
                    | (bytes[offset + 1] as u32) << 8
                    | (bytes[offset + 2] as u32) << 16
                    | (bytes[offset + 3] as u32) << 24) as i32
            };
            assert_eq!(manual(0), t);
            assert_eq!(manual(4), h);
            assert_eq!(manual(8), p);
            assert_eq!(bytes[12], s as u8);

            assert_eq!(frame.temperature(), t);
            assert_eq!(frame.humidity(), h);
            assert_eq!(frame.pressure(), p);
            assert_eq!(frame.switch_on(), s);
        }
    }

    #[test]
    fn test_from_bytes_accepts_encoded_frame() {
        let frame = TelemetryFrame::encode(21_500, 4_550, 99_000_000, false);
        let parsed = TelemetryFrame::from_bytes(frame.as_bytes()).expect("Should parse");
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        assert_eq!(TelemetryFrame::from_bytes(&[0u8; 12]), Err(FrameError::Length(12)));
        assert_eq!(TelemetryFrame::from_bytes(&[0u8; 14]), Err(FrameError::Length(14)));
        assert_eq!(TelemetryFrame::from_bytes(&[]), Err(FrameError::Length(0)));
    }

    #[test]
    fn test_from_bytes_rejects_bad_switch_byte() {
        let mut bytes = [0u8; 13];
        bytes[12] = 0x02;
        assert_eq!(TelemetryFrame::from_bytes(&bytes), Err(FrameError::SwitchByte(0x02)));
    }
}
