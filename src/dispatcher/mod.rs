//! Event handlers driven by the event loop
//!
//! Commands go to the actuator outputs, telemetry frames go to the notify
//! characteristic.

pub mod actuator;
pub mod telemetry;

pub use actuator::{ActuatorController, OutputLevels};
pub use telemetry::TelemetryDispatcher;
