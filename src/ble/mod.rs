//! Bluetooth Low Energy module
//!
//! Provides the environmental service: one write characteristic for
//! actuator commands and one read/notify characteristic for telemetry.

pub mod ingress;
pub mod link;
pub mod traits;

// GATT service definition depends on trouble-host, only available with embedded feature
#[cfg(feature = "embedded")]
pub mod service;

pub use ingress::{CommandIngress, IngressOutcome};
pub use link::{GattNotifier, NotifyLink};
pub use traits::{BleNotifier, NotifyError};

#[cfg(feature = "embedded")]
pub use service::EnvironmentService;
