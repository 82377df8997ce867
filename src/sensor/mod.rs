pub mod bme280;
pub mod traits;

pub use bme280::Bme280;
pub use traits::{Measurement, SensorError, SensorReader};
