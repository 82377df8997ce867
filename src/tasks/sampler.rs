//! Sensor sampling task
//!
//! Reads the environmental sensor and the switch, encodes a telemetry frame
//! and pushes it onto the telemetry queue, then pauses for one period. The
//! push waits for space, so a stalled dispatcher slows sampling down instead
//! of losing frames.

use core::fmt;

use embedded_hal::digital::InputPin;
use embedded_hal_async::delay::DelayNs;

use crate::config::sampler::PERIOD_MS;
use crate::context::{DeviceContext, Stats, TelemetrySender};
use crate::protocol::TelemetryFrame;
use crate::sensor::{Measurement, SensorReader};

/// Terminal state of a sampler whose sensor was missing at startup
///
/// There is no way out: the sampler never produces telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halted;

impl fmt::Display for Halted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sensor not detected, sampling halted")
    }
}

/// Periodic producer of telemetry frames
pub struct SensorSampler<'a, S, I, D> {
    sensor: S,
    switch: I,
    delay: D,
    queue: TelemetrySender<'a>,
    stats: &'a Stats,
}

impl<'a, S, I, D> SensorSampler<'a, S, I, D>
where
    S: SensorReader,
    I: InputPin,
    D: DelayNs,
{
    /// Check the sensor and build the sampler
    ///
    /// Returns [`Halted`] if the sensor does not answer. No retry.
    pub async fn start(
        ctx: &'a DeviceContext,
        mut sensor: S,
        switch: I,
        delay: D,
    ) -> Result<Self, Halted> {
        if !sensor.connect().await {
            log::error!("Sampler: {}", Halted);
            return Err(Halted);
        }

        log::info!("Sampler: sensor connected, sampling every {} ms", PERIOD_MS);
        Ok(Self {
            sensor,
            switch,
            delay,
            queue: ctx.telemetry_sender(),
            stats: ctx.stats(),
        })
    }

    /// Take one reading and encode it
    ///
    /// A failed sensor read encodes zeros, a failed switch read encodes
    /// "off". Both are counted.
    pub async fn sample(&mut self) -> TelemetryFrame {
        let reading = match self.sensor.read().await {
            Ok(reading) => reading,
            Err(e) => {
                self.stats.record_sensor_read_error();
                log::warn!("Sampler: {}", e);
                Measurement::default()
            }
        };

        // Pulled up, pressed pulls the line low
        let switch_on = match self.switch.is_low() {
            Ok(low) => low,
            Err(_) => {
                self.stats.record_sensor_read_error();
                log::warn!("Sampler: switch read failed");
                false
            }
        };

        TelemetryFrame::encode(
            reading.temperature,
            reading.humidity,
            reading.pressure as i32,
            switch_on,
        )
    }

    /// Sample, push (waiting while the queue is full), then sleep one period
    pub async fn tick(&mut self) {
        let frame = self.sample().await;
        self.queue.send(frame).await;
        self.delay.delay_ms(PERIOD_MS).await;
    }

    /// Sample forever
    pub async fn run(mut self) -> ! {
        loop {
            self.tick().await;
        }
    }
}

#[cfg(test)]
pub mod mock {
    //! Mock switch and delay for testing

    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorKind, ErrorType, InputPin};
    use embedded_hal_async::delay::DelayNs;

    /// Input pin with a settable level
    pub struct MockSwitch {
        pub high: bool,
    }

    impl MockSwitch {
        /// Released switch (line pulled high)
        pub fn released() -> Self {
            Self { high: true }
        }

        /// Pressed switch (line pulled low)
        pub fn pressed() -> Self {
            Self { high: false }
        }
    }

    impl ErrorType for MockSwitch {
        type Error = Infallible;
    }

    impl InputPin for MockSwitch {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.high)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.high)
        }
    }

    /// Input pin whose reads always fail
    pub struct FailingSwitch;

    impl ErrorType for FailingSwitch {
        type Error = ErrorKind;
    }

    impl InputPin for FailingSwitch {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Err(ErrorKind::Other)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Err(ErrorKind::Other)
        }
    }

    /// Delay that returns immediately and records what was asked for
    #[derive(Default)]
    pub struct MockDelay {
        pub calls: usize,
        pub total_ms: u64,
    }

    impl DelayNs for MockDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.calls += 1;
            self.total_ms += (ns / 1_000_000) as u64;
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.calls += 1;
            self.total_ms += ms as u64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{FailingSwitch, MockDelay, MockSwitch};
    use super::*;
    use crate::config::queues::TELEMETRY_DEPTH;
    use crate::sensor::traits::mock::MockSensor;
    use crate::sensor::SensorError;
    use core::pin::pin;
    use embassy_futures::poll_once;

    fn reading(temperature: i32, humidity: i32, pressure: i64) -> Measurement {
        Measurement {
            temperature,
            humidity,
            pressure,
        }
    }

    #[test]
    fn test_missing_sensor_halts() {
        let ctx = DeviceContext::new();

        futures::executor::block_on(async {
            let result =
                SensorSampler::start(&ctx, MockSensor::absent(), MockSwitch::released(), MockDelay::default())
                    .await;
            assert!(matches!(result, Err(Halted)));
        });

        assert!(ctx.telemetry_receiver().try_receive().is_err());
    }

    #[test]
    fn test_tick_pushes_frame() {
        let ctx = DeviceContext::new();
        let sensor = MockSensor::new();
        sensor.queue_reading(Ok(reading(-500, 6000, 101_325)));

        futures::executor::block_on(async {
            let mut sampler = SensorSampler::start(&ctx, sensor, MockSwitch::pressed(), MockDelay::default())
                .await
                .unwrap();
            sampler.tick().await;
            assert_eq!(sampler.delay.total_ms, PERIOD_MS as u64);
        });

        let frame = ctx.telemetry_receiver().try_receive().unwrap();
        assert_eq!(
            frame.as_bytes(),
            &[0x0C, 0xFE, 0xFF, 0xFF, 0x70, 0x17, 0x00, 0x00, 0xCD, 0x8B, 0x01, 0x00, 0x01]
        );
    }

    #[test]
    fn test_released_switch_is_off() {
        let ctx = DeviceContext::new();

        futures::executor::block_on(async {
            let mut sampler =
                SensorSampler::start(&ctx, MockSensor::new(), MockSwitch::released(), MockDelay::default())
                    .await
                    .unwrap();
            assert!(!sampler.sample().await.switch_on());

            sampler.switch.high = false;
            assert!(sampler.sample().await.switch_on());
        });
    }

    #[test]
    fn test_pressure_wraps_to_32_bits() {
        let ctx = DeviceContext::new();
        let sensor = MockSensor::new();
        sensor.queue_reading(Ok(reading(0, 0, 0x1_0000_0005)));
        sensor.queue_reading(Ok(reading(0, 0, 0xFFFF_FFFF)));

        futures::executor::block_on(async {
            let mut sampler = SensorSampler::start(&ctx, sensor, MockSwitch::released(), MockDelay::default())
                .await
                .unwrap();
            assert_eq!(sampler.sample().await.pressure(), 5);
            assert_eq!(sampler.sample().await.pressure(), -1);
        });
    }

    #[test]
    fn test_read_error_encodes_zeros() {
        let ctx = DeviceContext::new();
        let sensor = MockSensor::new();
        sensor.queue_reading(Err(SensorError::Bus));

        futures::executor::block_on(async {
            let mut sampler = SensorSampler::start(&ctx, sensor, MockSwitch::pressed(), MockDelay::default())
                .await
                .unwrap();
            let frame = sampler.sample().await;
            assert_eq!(frame, TelemetryFrame::encode(0, 0, 0, true));
        });

        assert_eq!(ctx.stats().snapshot().sensor_read_errors, 1);
    }

    #[test]
    fn test_switch_error_encodes_off() {
        let ctx = DeviceContext::new();
        let sensor = MockSensor::new();
        sensor.queue_reading(Ok(reading(21_000, 4_000, 100_000_000)));

        futures::executor::block_on(async {
            let mut sampler = SensorSampler::start(&ctx, sensor, FailingSwitch, MockDelay::default())
                .await
                .unwrap();
            let frame = sampler.sample().await;
            assert_eq!(frame, TelemetryFrame::encode(21_000, 4_000, 100_000_000, false));
        });

        assert_eq!(ctx.stats().snapshot().sensor_read_errors, 1);
    }

    #[test]
    fn test_full_queue_blocks_sampler() {
        let ctx = DeviceContext::new();
        let mut sensor = MockSensor::new();
        sensor.set_fallback(reading(1, 2, 3));

        futures::executor::block_on(async {
            let mut sampler = SensorSampler::start(&ctx, sensor, MockSwitch::released(), MockDelay::default())
                .await
                .unwrap();

            for _ in 0..TELEMETRY_DEPTH {
                sampler.tick().await;
            }

            {
                let mut blocked = pin!(sampler.tick());
                assert!(poll_once(blocked.as_mut()).is_pending());
                assert!(poll_once(blocked.as_mut()).is_pending());

                // Free one slot, the pending push completes
                assert!(ctx.telemetry_receiver().try_receive().is_ok());
                assert!(poll_once(blocked.as_mut()).is_ready());
            }

            // One period per completed tick, the blocked tick only slept once it got through
            assert_eq!(sampler.delay.calls, TELEMETRY_DEPTH + 1);
            assert_eq!(sampler.sensor.read_count(), TELEMETRY_DEPTH + 1);
        });

        let receiver = ctx.telemetry_receiver();
        let mut queued = 0;
        while receiver.try_receive().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, TELEMETRY_DEPTH);
    }
}
