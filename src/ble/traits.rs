//! BLE notify trait for abstraction and testability
//!
//! The dispatcher only needs to push a value to the notify characteristic,
//! so the GATT server can be swapped with a mock for testing.

use core::fmt;
use core::future::Future;

/// Errors that can occur when publishing a characteristic value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyError {
    /// No central is connected
    NotConnected,
    /// The stack refused or failed the notification
    Transport,
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::NotConnected => f.write_str("no central connected"),
            NotifyError::Transport => f.write_str("notification failed"),
        }
    }
}

/// Abstract notify characteristic
pub trait BleNotifier {
    /// Publish `value` as the characteristic's new value
    ///
    /// Fire-and-forget: callers do not retry on error.
    fn notify(&mut self, value: &[u8]) -> impl Future<Output = Result<(), NotifyError>>;
}
