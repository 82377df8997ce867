//! Long-running tasks
//!
//! The sampler and the event loop are the two concurrent units of the core.
//! The BLE host task owns the radio and the GATT connection.

pub mod event_loop;
pub mod sampler;

// trouble-host is only available with the embedded feature
#[cfg(feature = "embedded")]
pub mod ble;

pub use event_loop::{Event, EventLoop};
pub use sampler::{Halted, SensorSampler};
