//! Integration tests for the environmental node firmware.
//!
//! Run after flashing the firmware. Connects over BLE, subscribes to the
//! telemetry characteristic and exercises the command characteristic.

mod ble_client;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use ble_client::BleClient;
use env_node_firmware::config::ble::DEVICE_NAME;
use tests::{print_results, run_all_tests};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "BLE integration tests for the environmental node")]
struct Args {
    /// Advertised name of the device
    #[arg(short, long, default_value = DEVICE_NAME)]
    name: String,

    /// BLE scan timeout in seconds
    #[arg(long, default_value = "10")]
    scan_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("{}", "Environmental Node Integration Tests".bold());
    println!("Device: BLE (scanning for \"{}\")", args.name);
    println!();

    let device = BleClient::connect_by_name(&args.name, Duration::from_secs(args.scan_timeout)).await?;
    println!("{}", "Connected!".green());

    println!("\nRunning tests...\n");

    let results = run_all_tests(&device).await;
    print_results(&results);

    let _ = device.disconnect().await;

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
