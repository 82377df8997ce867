//! Hand-off from the event loop to the BLE connection
//!
//! The GATT connection lives in the BLE task, so the event loop cannot
//! notify on it directly. [`GattNotifier`] parks the newest frame in a
//! signal that the connection loop drains. An unsent older frame is replaced,
//! so the characteristic holds the latest frame, and the replaced one is
//! counted as lost.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use super::traits::{BleNotifier, NotifyError};
use crate::config::protocol::TELEMETRY_FRAME_SIZE;
use crate::context::Stats;

/// Connection state plus the pending notify value
pub struct NotifyLink {
    connected: AtomicBool,
    outbound: Signal<CriticalSectionRawMutex, [u8; TELEMETRY_FRAME_SIZE]>,
}

impl NotifyLink {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            outbound: Signal::new(),
        }
    }

    /// Called by the BLE task on connect and disconnect
    ///
    /// Returns `true` if a pending value was discarded by the disconnect.
    pub fn set_connected(&self, connected: bool) -> bool {
        self.connected.store(connected, Ordering::Release);
        // Nothing queued for a central that is gone
        !connected && self.outbound.try_take().is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Wait for the next value to notify
    pub async fn next_value(&self) -> [u8; TELEMETRY_FRAME_SIZE] {
        self.outbound.wait().await
    }

    pub fn notifier<'a>(&'a self, stats: &'a Stats) -> GattNotifier<'a> {
        GattNotifier { link: self, stats }
    }
}

impl Default for NotifyLink {
    fn default() -> Self {
        Self::new()
    }
}

/// [`BleNotifier`] backed by a [`NotifyLink`]
pub struct GattNotifier<'a> {
    link: &'a NotifyLink,
    stats: &'a Stats,
}

impl BleNotifier for GattNotifier<'_> {
    async fn notify(&mut self, value: &[u8]) -> Result<(), NotifyError> {
        if !self.link.is_connected() {
            return Err(NotifyError::NotConnected);
        }

        let bytes: [u8; TELEMETRY_FRAME_SIZE] =
            value.try_into().map_err(|_| NotifyError::Transport)?;
        if self.link.outbound.try_take().is_some() {
            self.stats.record_frame_lost();
            log::debug!("BLE: unsent frame replaced");
        }
        self.link.outbound.signal(bytes);
        Ok(())
    }
}
