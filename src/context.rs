//! Shared device context
//!
//! Holds the two bounded queues between the producers (sampler, BLE write
//! callback) and the single consumer (event loop), plus counters for every
//! event the core drops on purpose. Construct once and hand out references.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

use crate::config::queues::{COMMAND_DEPTH, TELEMETRY_DEPTH};
use crate::protocol::{CommandByte, TelemetryFrame};

/// Telemetry queue: sampler → event loop, blocking on full
pub type TelemetryChannel = Channel<CriticalSectionRawMutex, TelemetryFrame, TELEMETRY_DEPTH>;
pub type TelemetrySender<'a> = Sender<'a, CriticalSectionRawMutex, TelemetryFrame, TELEMETRY_DEPTH>;
pub type TelemetryReceiver<'a> =
    Receiver<'a, CriticalSectionRawMutex, TelemetryFrame, TELEMETRY_DEPTH>;

/// Command queue: BLE write callback → event loop, dropping on full
pub type CommandChannel = Channel<CriticalSectionRawMutex, CommandByte, COMMAND_DEPTH>;
pub type CommandSender<'a> = Sender<'a, CriticalSectionRawMutex, CommandByte, COMMAND_DEPTH>;
pub type CommandReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, CommandByte, COMMAND_DEPTH>;

/// Counters for conditions the firmware absorbs without reporting upstream
pub struct Stats {
    sensor_read_errors: AtomicU32,
    commands_accepted: AtomicU32,
    commands_malformed: AtomicU32,
    commands_dropped: AtomicU32,
    frames_sent: AtomicU32,
    notify_failures: AtomicU32,
    frames_lost: AtomicU32,
}

/// Point-in-time copy of [`Stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub sensor_read_errors: u32,
    pub commands_accepted: u32,
    pub commands_malformed: u32,
    pub commands_dropped: u32,
    /// Frames handed to the transport
    pub frames_sent: u32,
    /// Frames refused at hand-off (not counted as sent)
    pub notify_failures: u32,
    /// Sent frames that never reached the central: replaced while pending,
    /// discarded on disconnect or failed in the stack
    pub frames_lost: u32,
}

impl Stats {
    pub const fn new() -> Self {
        Self {
            sensor_read_errors: AtomicU32::new(0),
            commands_accepted: AtomicU32::new(0),
            commands_malformed: AtomicU32::new(0),
            commands_dropped: AtomicU32::new(0),
            frames_sent: AtomicU32::new(0),
            notify_failures: AtomicU32::new(0),
            frames_lost: AtomicU32::new(0),
        }
    }

    pub fn record_sensor_read_error(&self) {
        self.sensor_read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_accepted(&self) {
        self.commands_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_malformed(&self) {
        self.commands_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_dropped(&self) {
        self.commands_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notify_failure(&self) {
        self.notify_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_lost(&self) {
        self.frames_lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sensor_read_errors: self.sensor_read_errors.load(Ordering::Relaxed),
            commands_accepted: self.commands_accepted.load(Ordering::Relaxed),
            commands_malformed: self.commands_malformed.load(Ordering::Relaxed),
            commands_dropped: self.commands_dropped.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
            frames_lost: self.frames_lost.load(Ordering::Relaxed),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Queues and counters shared by every component of the core
pub struct DeviceContext {
    telemetry: TelemetryChannel,
    commands: CommandChannel,
    stats: Stats,
}

impl DeviceContext {
    /// `const` so it can live in a `static`
    pub const fn new() -> Self {
        Self {
            telemetry: Channel::new(),
            commands: Channel::new(),
            stats: Stats::new(),
        }
    }

    pub fn telemetry_sender(&self) -> TelemetrySender<'_> {
        self.telemetry.sender()
    }

    pub fn telemetry_receiver(&self) -> TelemetryReceiver<'_> {
        self.telemetry.receiver()
    }

    pub fn command_sender(&self) -> CommandSender<'_> {
        self.commands.sender()
    }

    pub fn command_receiver(&self) -> CommandReceiver<'_> {
        self.commands.receiver()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self::new()
    }
}
