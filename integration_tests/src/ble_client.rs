//! BLE client for the environmental node service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use btleplug::api::{
    Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use env_node_firmware::protocol::TelemetryFrame;
use futures::StreamExt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Environmental service UUIDs
const SERVICE_UUID: Uuid = Uuid::from_u128(0xa0b40001_926d_4d61_98df_8c5c62ee53b3);
const COMMAND_UUID: Uuid = Uuid::from_u128(0xa0b40002_926d_4d61_98df_8c5c62ee53b3); // Write to device
const TELEMETRY_UUID: Uuid = Uuid::from_u128(0xa0b40003_926d_4d61_98df_8c5c62ee53b3); // Notify from device

/// BLE client for communicating with the node.
pub struct BleClient {
    peripheral: Peripheral,
    command_char: Characteristic,
    telemetry_char: Characteristic,
    /// Raw notification values in arrival order
    notifications: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BleClient {
    /// Scan for a device by name and connect.
    pub async fn connect_by_name(name: &str, scan_timeout: Duration) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No Bluetooth adapters found"))?;

        adapter.start_scan(ScanFilter::default()).await?;
        let peripheral = Self::find_device_by_name(&adapter, name, scan_timeout).await?;
        adapter.stop_scan().await?;

        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let services = peripheral.services();
        if !services.iter().any(|s| s.uuid == SERVICE_UUID) {
            return Err(anyhow!("Environmental service not found"));
        }

        let characteristics = peripheral.characteristics();

        let command_char = characteristics
            .iter()
            .find(|c| c.uuid == COMMAND_UUID)
            .cloned()
            .ok_or_else(|| anyhow!("Command characteristic not found"))?;

        let telemetry_char = characteristics
            .iter()
            .find(|c| c.uuid == TELEMETRY_UUID)
            .cloned()
            .ok_or_else(|| anyhow!("Telemetry characteristic not found"))?;

        peripheral.subscribe(&telemetry_char).await?;

        let notifications = Arc::new(Mutex::new(Vec::new()));

        // Collect notifications in the background
        let sink = notifications.clone();
        let peripheral_clone = peripheral.clone();
        tokio::spawn(async move {
            let mut stream = match peripheral_clone.notifications().await {
                Ok(s) => s,
                Err(_) => return,
            };

            while let Some(data) = stream.next().await {
                if data.uuid == TELEMETRY_UUID {
                    sink.lock().await.push(data.value);
                }
            }
        });

        Ok(Self {
            peripheral,
            command_char,
            telemetry_char,
            notifications,
        })
    }

    /// Find a device by name within the scan timeout.
    async fn find_device_by_name(
        adapter: &Adapter,
        name: &str,
        scan_timeout: Duration,
    ) -> Result<Peripheral> {
        let start = std::time::Instant::now();

        while start.elapsed() < scan_timeout {
            for peripheral in adapter.peripherals().await? {
                if let Some(props) = peripheral.properties().await? {
                    if props.local_name.as_deref() == Some(name) {
                        return Ok(peripheral);
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(anyhow!("Device '{}' not found within timeout", name))
    }

    /// Write raw bytes to the command characteristic.
    pub async fn write_command(&self, payload: &[u8], write_type: WriteType) -> Result<()> {
        self.peripheral
            .write(&self.command_char, payload, write_type)
            .await?;
        Ok(())
    }

    /// Read the telemetry characteristic's current value.
    pub async fn read_telemetry(&self) -> Result<Vec<u8>> {
        Ok(self.peripheral.read(&self.telemetry_char).await?)
    }

    /// Drop everything received so far.
    pub async fn clear_notifications(&self) {
        self.notifications.lock().await.clear();
    }

    /// Wait `window` and return every notification received meanwhile.
    pub async fn collect_for(&self, window: Duration) -> Vec<Vec<u8>> {
        self.clear_notifications().await;
        tokio::time::sleep(window).await;
        std::mem::take(&mut *self.notifications.lock().await)
    }

    /// Collect for `window` and decode every notification as a frame.
    pub async fn collect_frames(&self, window: Duration) -> Result<Vec<TelemetryFrame>> {
        self.collect_for(window)
            .await
            .iter()
            .map(|raw| {
                TelemetryFrame::from_bytes(raw)
                    .map_err(|e| anyhow!("Bad frame {:02x?}: {}", raw, e))
            })
            .collect()
    }

    pub async fn is_connected(&self) -> Result<bool> {
        Ok(self.peripheral.is_connected().await?)
    }

    /// Disconnect from the device.
    pub async fn disconnect(&self) -> Result<()> {
        self.peripheral.unsubscribe(&self.telemetry_char).await?;
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
