#![no_std]
#![no_main]

extern crate alloc;

// Required for ESP-IDF bootloader compatibility
// Use explicit parameters to ensure correct efuse block revision values
esp_bootloader_esp_idf::esp_app_desc!(
    env!("CARGO_PKG_VERSION"),  // version
    env!("CARGO_PKG_NAME"),     // project_name
    "00:00:00",                 // build_time
    "2025-01-01",               // build_date
    "0.0.0",                    // idf_ver (not using IDF)
    0x10000,                    // mmu_page_size (64KB)
    0,                          // min_efuse_blk_rev_full (accept all)
    u16::MAX                    // max_efuse_blk_rev_full (accept all)
);

use embassy_executor::Spawner;
use embassy_sync::signal::Signal;
use embassy_time::{Delay, Duration, Timer};
use esp_backtrace as _;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::Async;
use static_cell::StaticCell;

use env_node_firmware::ble::NotifyLink;
use env_node_firmware::config;
use env_node_firmware::context::DeviceContext;
use env_node_firmware::dispatcher::ActuatorController;
use env_node_firmware::sensor::Bme280;
use env_node_firmware::tasks::ble::{ble_task, StartupSignal};
use env_node_firmware::tasks::{EventLoop, SensorSampler};

/// Queues and counters shared by all tasks
static CONTEXT: DeviceContext = DeviceContext::new();

/// Telemetry hand-off from the event loop to the BLE connection
static LINK: NotifyLink = NotifyLink::new();

/// Set by the BLE task once advertising is up (or failed)
static STARTUP: StartupSignal = Signal::new();

/// Static executor for embassy
static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();

/// Static cell for esp-radio controller (needed for 'static lifetime)
static RADIO_CONTROLLER: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();

/// Type alias for the BLE controller
type BleController = trouble_host::prelude::ExternalController<
    esp_radio::ble::controller::BleConnector<'static>,
    10,
>;

/// Type alias for the sensor on the async I2C bus
type Sensor = Bme280<I2c<'static, Async>>;

#[esp_hal::main]
fn main() -> ! {
    esp_println::logger::init_logger(log::LevelFilter::Info);

    // Initialise heap allocator for BLE support (64KB - BLE requires significant heap)
    esp_alloc::heap_allocator!(size: 64 * 1024);

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // GPIO numbers below must stay in sync with config::pins
    log::info!(
        "EnvNode: switch GPIO{}, LEDs GPIO{}/{}/{}, buzzer GPIO{}, I2C SDA GPIO{} SCL GPIO{}",
        config::pins::SWITCH,
        config::pins::LED1,
        config::pins::LED2,
        config::pins::LED3,
        config::pins::BUZZER,
        config::pins::I2C_SDA,
        config::pins::I2C_SCL,
    );

    // Actuators start idle: LEDs off (active low), buzzer off
    let actuators = ActuatorController::new(
        Output::new(peripherals.GPIO7, Level::High, OutputConfig::default()),
        Output::new(peripherals.GPIO10, Level::High, OutputConfig::default()),
        Output::new(peripherals.GPIO11, Level::High, OutputConfig::default()),
        Output::new(peripherals.GPIO12, Level::Low, OutputConfig::default()),
    );

    // Switch pulls the line low when pressed
    let switch = Input::new(peripherals.GPIO6, InputConfig::default().with_pull(Pull::Up));

    // Initialise the RTOS scheduler with timer - MUST be done before any async operations
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Configure I2C for the BME280
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(config::sensor::I2C_FREQUENCY_KHZ)),
    )
    .expect("Failed to configure I2C")
    .with_sda(peripherals.GPIO8)
    .with_scl(peripherals.GPIO9)
    .into_async();
    let bme280 = Bme280::new(i2c, config::sensor::I2C_ADDRESS);

    // Initialise esp-radio for BLE support (must be after esp_rtos::start)
    let radio_controller = RADIO_CONTROLLER.init(
        esp_radio::init().expect("Failed to initialize esp-radio")
    );

    // Create BLE connector (ownership is passed to ExternalController)
    let ble_connector = esp_radio::ble::controller::BleConnector::new(
        radio_controller,
        peripherals.BT,
        esp_radio::ble::Config::default(),
    ).expect("Failed to initialize BLE connector");

    // Wrap in ExternalController for trouble-host compatibility
    let controller: BleController = trouble_host::prelude::ExternalController::new(ble_connector);

    // Create and run the embassy executor
    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(async_main(spawner, bme280, switch, actuators, controller));
    })
}

/// Brings up BLE, starts sampling and becomes the event loop
#[embassy_executor::task]
async fn async_main(
    spawner: Spawner,
    sensor: Sensor,
    switch: Input<'static>,
    actuators: ActuatorController<Output<'static>>,
    ble_controller: BleController,
) {
    spawner.must_spawn(ble_host_task(ble_controller));

    // BLE enable/register/advertise failures are fatal: never reach the event loop
    if let Err(e) = STARTUP.wait().await {
        panic!("BLE startup failed: {}", e);
    }

    spawner.must_spawn(sampler_task(sensor, switch));

    EventLoop::new(&CONTEXT, actuators, LINK.notifier(CONTEXT.stats())).run().await
}

/// Task that manages BLE connectivity
#[embassy_executor::task]
async fn ble_host_task(controller: BleController) {
    ble_task(controller, &CONTEXT, &LINK, &STARTUP).await;
}

/// Task that samples the sensor and switch
///
/// A missing sensor leaves the task parked in the halted state, repeating the
/// diagnostic. Telemetry is never produced in that case.
#[embassy_executor::task]
async fn sampler_task(sensor: Sensor, switch: Input<'static>) {
    match SensorSampler::start(&CONTEXT, sensor, switch, Delay).await {
        Ok(sampler) => sampler.run().await,
        Err(halted) => loop {
            log::error!("{}", halted);
            Timer::after(Duration::from_millis(config::sampler::HALT_REPORT_INTERVAL_MS)).await;
        },
    }
}
