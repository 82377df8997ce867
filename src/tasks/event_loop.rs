//! Main event loop
//!
//! Single consumer of both queues. Each iteration waits for whichever queue
//! has an item first and handles exactly that one item: commands go to the
//! actuators, frames go to the notify characteristic. Order is FIFO within a
//! queue and unspecified between the two.

use embassy_futures::select::{select, Either};
use embedded_hal::digital::OutputPin;

use crate::ble::traits::BleNotifier;
use crate::context::{CommandReceiver, DeviceContext, TelemetryReceiver};
use crate::dispatcher::{ActuatorController, TelemetryDispatcher};
use crate::protocol::{CommandByte, TelemetryFrame};

/// The item handled by one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Command(CommandByte),
    Telemetry(TelemetryFrame),
}

pub struct EventLoop<'a, P, N> {
    commands: CommandReceiver<'a>,
    telemetry: TelemetryReceiver<'a>,
    actuators: ActuatorController<P>,
    dispatcher: TelemetryDispatcher<'a, N>,
}

impl<'a, P, N> EventLoop<'a, P, N>
where
    P: OutputPin,
    N: BleNotifier,
{
    pub fn new(ctx: &'a DeviceContext, actuators: ActuatorController<P>, notifier: N) -> Self {
        Self {
            commands: ctx.command_receiver(),
            telemetry: ctx.telemetry_receiver(),
            actuators,
            dispatcher: TelemetryDispatcher::new(notifier, ctx.stats()),
        }
    }

    /// Wait for one event and handle it
    pub async fn step(&mut self) -> Event {
        let event = match select(self.commands.receive(), self.telemetry.receive()).await {
            Either::First(command) => Event::Command(command),
            Either::Second(frame) => Event::Telemetry(frame),
        };

        match event {
            Event::Command(command) => {
                let levels = self.actuators.apply(command);
                log::debug!("Command 0x{:02x}: {:?}", command.raw(), levels);
            }
            Event::Telemetry(frame) => self.dispatcher.dispatch(frame).await,
        }

        event
    }

    /// Handle events for the lifetime of the device
    pub async fn run(mut self) -> ! {
        log::info!("Event loop running");
        loop {
            self.step().await;
        }
    }

    pub fn dispatcher(&self) -> &TelemetryDispatcher<'a, N> {
        &self.dispatcher
    }

    pub fn into_actuators(self) -> ActuatorController<P> {
        self.actuators
    }
}
