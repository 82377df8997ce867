//! BLE host task
//!
//! Owns the controller and the GATT connection. Writes to the command
//! characteristic go through [`CommandIngress`]; frames handed over by the
//! event loop through [`NotifyLink`] go out as notifications.

use core::fmt;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use trouble_host::prelude::*;

use crate::ble::{CommandIngress, EnvironmentService, NotifyLink};
use crate::config::ble::{ADDRESS, DEVICE_NAME, READVERTISE_DELAY_MS};
use crate::context::DeviceContext;

/// Number of maximum concurrent connections
const CONNECTIONS_MAX: usize = 1;
/// Number of L2CAP channels
const L2CAP_CHANNELS_MAX: usize = 3;

/// Failures that stop the device before the event loop starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupError {
    /// GATT attribute table could not be built
    GattServer,
    /// Advertising payload did not fit
    AdvertisingData,
    /// Controller refused to start advertising
    Advertise,
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::GattServer => f.write_str("GATT service registration failed"),
            StartupError::AdvertisingData => f.write_str("advertising data too large"),
            StartupError::Advertise => f.write_str("advertising failed to start"),
        }
    }
}

/// Reports whether the BLE stack came up
pub type StartupSignal = Signal<CriticalSectionRawMutex, Result<(), StartupError>>;

/// BLE GATT Server with the environmental service
#[gatt_server(mutex_type = CriticalSectionRawMutex)]
struct Server {
    env: EnvironmentService,
}

/// Main BLE task that manages the Bluetooth stack and connections
///
/// This task:
/// 1. Builds the host stack and registers the service
/// 2. Advertises and signals `startup` once advertising is up
/// 3. Serves one central at a time
/// 4. Routes command writes into the command queue
/// 5. Notifies telemetry frames from `link`
///
/// Returns only if startup fails.
pub async fn ble_task<C: Controller>(
    controller: C,
    ctx: &DeviceContext,
    link: &NotifyLink,
    startup: &StartupSignal,
) {
    // Create BLE host resources
    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> =
        HostResources::new();

    let stack = trouble_host::new(controller, &mut resources)
        .set_random_address(Address::random(ADDRESS));

    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    let gap = GapConfig::Peripheral(PeripheralConfig {
        name: DEVICE_NAME,
        appearance: &appearance::UNKNOWN,
    });
    let server: Server = match Server::new_with_config(gap) {
        Ok(s) => s,
        Err(_) => {
            startup.signal(Err(StartupError::GattServer));
            return;
        }
    };

    let runner_task = runner.run();

    let peripheral_task = async {
        let mut adv_data = [0u8; 31];
        let len = match AdStructure::encode_slice(
            &[
                AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
                AdStructure::CompleteLocalName(DEVICE_NAME.as_bytes()),
            ],
            &mut adv_data,
        ) {
            Ok(l) => l,
            Err(_) => {
                startup.signal(Err(StartupError::AdvertisingData));
                return;
            }
        };

        let ingress = CommandIngress::new(ctx);
        let stats = ctx.stats();
        let mut started = false;

        loop {
            let advertiser = match peripheral
                .advertise(
                    &Default::default(),
                    Advertisement::ConnectableScannableUndirected {
                        adv_data: &adv_data[..len],
                        scan_data: &[],
                    },
                )
                .await
            {
                Ok(a) => a,
                Err(_) if !started => {
                    startup.signal(Err(StartupError::Advertise));
                    return;
                }
                Err(_) => {
                    log::warn!("BLE: advertising failed, retrying");
                    Timer::after(Duration::from_millis(READVERTISE_DELAY_MS)).await;
                    continue;
                }
            };

            if !started {
                started = true;
                startup.signal(Ok(()));
            }
            log::info!("BLE: advertising as '{}'", DEVICE_NAME);

            let acceptor = match advertiser.accept().await {
                Ok(a) => a,
                Err(_) => continue,
            };

            let conn = match acceptor.with_attribute_server(&*server) {
                Ok(c) => c,
                Err(_) => continue,
            };

            log::info!("BLE: connected");
            link.set_connected(true);

            loop {
                match select(conn.next(), link.next_value()).await {
                    Either::First(gatt_event) => match gatt_event {
                        GattConnectionEvent::Disconnected { reason: _ } => {
                            log::info!("BLE: disconnected");
                            break;
                        }
                        GattConnectionEvent::Gatt { event } => match event {
                            GattEvent::Write(write_event) => {
                                if write_event.handle() == server.env.command.handle {
                                    // Write requests and write commands carry no offset
                                    ingress.on_write(0, write_event.data());
                                }
                                let _ = write_event.accept();
                            }
                            GattEvent::Read(read_event) => {
                                let _ = read_event.accept();
                            }
                            GattEvent::Other(other_event) => {
                                let _ = other_event.accept();
                            }
                        },
                        _ => {}
                    },
                    Either::Second(value) => {
                        match server.env.telemetry.notify(&conn, &value).await {
                            Ok(()) => {}
                            Err(_) => {
                                // Already counted as sent by the dispatcher
                                stats.record_frame_lost();
                                log::debug!("BLE: notify failed");
                            }
                        }
                    }
                }
            }

            if link.set_connected(false) {
                stats.record_frame_lost();
            }
        }
    };

    select(runner_task, peripheral_task).await;
}
