//! Wire formats for the telemetry and command characteristics

pub mod command;
pub mod telemetry;

pub use command::{decode_command, Actuator, CommandByte};
pub use telemetry::{FrameError, TelemetryFrame};
