//! Environmental service definition
//!
//! - Service UUID: A0B40001-926D-4D61-98DF-8C5C62EE53B3
//! - Command characteristic: A0B40002-... (write, write without response)
//! - Telemetry characteristic: A0B40003-... (read, notify)

use trouble_host::prelude::*;

use crate::config::protocol::{COMMAND_SIZE, TELEMETRY_FRAME_SIZE};

/// Environmental sensing + actuator service
#[gatt_service(uuid = "a0b40001-926d-4d61-98df-8c5c62ee53b3")]
pub struct EnvironmentService {
    /// Command characteristic - client writes one actuator bitmask byte here
    #[characteristic(uuid = "a0b40002-926d-4d61-98df-8c5c62ee53b3", write, write_without_response, value = [0u8; 1])]
    pub command: [u8; COMMAND_SIZE],

    /// Telemetry characteristic - latest 13-byte frame, notified on every update
    #[characteristic(uuid = "a0b40003-926d-4d61-98df-8c5c62ee53b3", read, notify, value = [0u8; 13])]
    pub telemetry: [u8; TELEMETRY_FRAME_SIZE],
}
