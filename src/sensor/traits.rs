//! Environmental sensor trait for abstraction and testability
//!
//! The sampler only needs "is it there" and "give me a reading", so the
//! bus-level driver can be swapped with a mock for testing.

use core::fmt;
use core::future::Future;

/// Errors that can occur while talking to the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Bus transaction failed
    Bus,
    /// Device did not answer with the expected chip ID
    NotDetected,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Bus => f.write_str("sensor bus error"),
            SensorError::NotDetected => f.write_str("sensor not detected"),
        }
    }
}

/// One compensated reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Measurement {
    /// Temperature in milli-degrees Celsius
    pub temperature: i32,
    /// Relative humidity in hundredths of a percent
    pub humidity: i32,
    /// Pressure in milli-pascal
    pub pressure: i64,
}

/// Abstract temperature/humidity/pressure sensor
pub trait SensorReader {
    /// Probe the device and prepare it for measurements
    ///
    /// Returns false if nothing answers on the bus or the device is not
    /// the expected part.
    fn connect(&mut self) -> impl Future<Output = bool>;

    /// Read temperature, humidity and pressure in one go
    fn read(&mut self) -> impl Future<Output = Result<Measurement, SensorError>>;
}
