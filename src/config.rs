//! Hardware and protocol configuration constants for the ESP32-S3 node

/// GPIO assignment
pub mod pins {
    /// I2C bus to the environmental sensor
    pub const I2C_SDA: u8 = 8;
    pub const I2C_SCL: u8 = 9;

    /// Momentary switch, pulled up (pressed = low)
    pub const SWITCH: u8 = 6;

    /// Actuator outputs. LEDs are wired active-low, the buzzer active-high.
    pub const LED1: u8 = 7;
    pub const LED2: u8 = 10;
    pub const LED3: u8 = 11;
    pub const BUZZER: u8 = 12;
}

/// BME280 sensor
pub mod sensor {
    /// I2C address with SDO pulled high
    pub const I2C_ADDRESS: u8 = 0x77;

    /// I2C bus clock in kHz
    pub const I2C_FREQUENCY_KHZ: u32 = 100;
}

/// Sampling cadence
pub mod sampler {
    /// Pause between telemetry frames
    pub const PERIOD_MS: u32 = 100;

    /// How often the halted sampler repeats its diagnostic
    pub const HALT_REPORT_INTERVAL_MS: u64 = 1000;
}

/// Queue depths
pub mod queues {
    /// Telemetry frames buffered while the dispatcher is stalled
    pub const TELEMETRY_DEPTH: usize = 13;

    /// Commands buffered between the BLE callback and the event loop
    pub const COMMAND_DEPTH: usize = 4;
}

/// Bluetooth configuration
pub mod ble {
    /// Advertised local name
    pub const DEVICE_NAME: &str = "EnvNode";

    /// Static random address
    pub const ADDRESS: [u8; 6] = [0xE3, 0x53, 0xEE, 0x62, 0x5C, 0xC8];

    /// Back-off before retrying a failed advertisement
    pub const READVERTISE_DELAY_MS: u64 = 500;
}

/// Protocol constants
pub mod protocol {
    /// Size of one telemetry frame on the wire
    pub const TELEMETRY_FRAME_SIZE: usize = 13;

    /// Size of one actuator command on the wire
    pub const COMMAND_SIZE: usize = 1;
}
