//! Actuator command byte
//!
//! A command is a single byte written to the command characteristic. Each of
//! the low four bits switches one actuator; bits 4-7 are ignored.
//!
//! ```text
//! bit 7..4  reserved
//! bit 3     buzzer
//! bit 2     LED3
//! bit 1     LED2
//! bit 0     LED1
//! ```

use crate::config::protocol::COMMAND_SIZE;

/// Physical outputs addressed by a command bit
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuator {
    Led1 = 0,
    Led2 = 1,
    Led3 = 2,
    Buzzer = 3,
}

impl Actuator {
    /// All actuators in bit order
    pub const ALL: [Actuator; 4] = [Actuator::Led1, Actuator::Led2, Actuator::Led3, Actuator::Buzzer];

    /// Bit mask of this actuator within a command byte
    pub const fn mask(self) -> u8 {
        1 << self as u8
    }
}

/// A decoded actuator command
///
/// Every byte value is structurally valid; only bits 0-3 carry meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandByte(u8);

impl CommandByte {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// The byte as received
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Whether the bit for `actuator` is set
    pub const fn is_set(self, actuator: Actuator) -> bool {
        self.0 & actuator.mask() != 0
    }
}

/// Decode a raw write payload into a command
///
/// Returns `None` unless the payload is exactly one byte long.
pub fn decode_command(payload: &[u8]) -> Option<CommandByte> {
    if payload.len() != COMMAND_SIZE {
        return None;
    }
    Some(CommandByte(payload[0]))
}
