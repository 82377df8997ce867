//! Command ingress from the BLE write callback
//!
//! Runs in whatever context the BLE stack delivers writes in. It only
//! validates and does a non-blocking enqueue; it never touches the pins.

use crate::context::{CommandSender, DeviceContext, Stats};
use crate::protocol::{decode_command, CommandByte};

/// What happened to a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngressOutcome {
    /// Queued for the event loop
    Accepted(CommandByte),
    /// Wrong offset or length, ignored
    Malformed,
    /// Command queue full, dropped
    QueueFull,
}

/// Producer side of the command queue
pub struct CommandIngress<'a> {
    sender: CommandSender<'a>,
    stats: &'a Stats,
}

impl<'a> CommandIngress<'a> {
    pub fn new(ctx: &'a DeviceContext) -> Self {
        Self {
            sender: ctx.command_sender(),
            stats: ctx.stats(),
        }
    }

    /// Handle one characteristic write
    ///
    /// Never blocks. Anything but a single byte at offset 0 is dropped, as is
    /// a valid command that finds the queue full.
    pub fn on_write(&self, offset: usize, payload: &[u8]) -> IngressOutcome {
        let command = match decode_command(payload) {
            Some(command) if offset == 0 => command,
            _ => {
                self.stats.record_command_malformed();
                log::debug!("Ingress: ignored write (offset {}, {} bytes)", offset, payload.len());
                return IngressOutcome::Malformed;
            }
        };

        match self.sender.try_send(command) {
            Ok(()) => {
                self.stats.record_command_accepted();
                IngressOutcome::Accepted(command)
            }
            Err(_) => {
                self.stats.record_command_dropped();
                log::warn!("Ingress: command queue full, dropped 0x{:02x}", command.raw());
                IngressOutcome::QueueFull
            }
        }
    }
}
