//! Bosch BME280 driver over async I2C
//!
//! Runs the part in normal mode with x1 oversampling on every channel and
//! applies the integer compensation formulas from the datasheet. Readings
//! come out in the units of [`Measurement`].

use embedded_hal_async::i2c::I2c;

use super::traits::{Measurement, SensorError, SensorReader};

const REG_CALIB_00: u8 = 0x88;
const REG_CHIP_ID: u8 = 0xD0;
const REG_CALIB_26: u8 = 0xE1;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_PRESS_MSB: u8 = 0xF7;

const CHIP_ID: u8 = 0x60;

/// Humidity oversampling x1
const CTRL_HUM_OSRS_X1: u8 = 0x01;
/// Temperature x1, pressure x1, normal mode
const CTRL_MEAS_NORMAL_X1: u8 = (0b001 << 5) | (0b001 << 2) | 0b11;
/// 0.5 ms standby, filter off
const CONFIG_DEFAULT: u8 = 0x00;

const CALIB_BLOCK1_LEN: usize = 26;
const CALIB_BLOCK2_LEN: usize = 7;
const DATA_LEN: usize = 8;

/// Factory trimming parameters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p2: i16,
    p3: i16,
    p4: i16,
    p5: i16,
    p6: i16,
    p7: i16,
    p8: i16,
    p9: i16,
    h1: u8,
    h2: i16,
    h3: u8,
    h4: i16,
    h5: i16,
    h6: i8,
}

/// Uncompensated ADC values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub pressure: i32,
    pub temperature: i32,
    pub humidity: i32,
}

impl RawSample {
    /// Unpack the burst read starting at 0xF7
    pub fn from_registers(data: &[u8; DATA_LEN]) -> Self {
        let adc20 = |msb: u8, lsb: u8, xlsb: u8| {
            ((msb as i32) << 12) | ((lsb as i32) << 4) | ((xlsb as i32) >> 4)
        };
        Self {
            pressure: adc20(data[0], data[1], data[2]),
            temperature: adc20(data[3], data[4], data[5]),
            humidity: ((data[6] as i32) << 8) | data[7] as i32,
        }
    }
}

impl Calibration {
    /// Decode the two calibration blocks (0x88..=0xA1 and 0xE1..=0xE7)
    pub fn from_registers(
        block1: &[u8; CALIB_BLOCK1_LEN],
        block2: &[u8; CALIB_BLOCK2_LEN],
    ) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([block1[i], block1[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([block1[i], block1[i + 1]]);

        // H4 and H5 share the nibbles of 0xE5
        let e4 = block2[3] as i8 as i16;
        let e5 = block2[4] as i16;
        let e6 = block2[5] as i8 as i16;

        Self {
            t1: u16_at(0),
            t2: i16_at(2),
            t3: i16_at(4),
            p1: u16_at(6),
            p2: i16_at(8),
            p3: i16_at(10),
            p4: i16_at(12),
            p5: i16_at(14),
            p6: i16_at(16),
            p7: i16_at(18),
            p8: i16_at(20),
            p9: i16_at(22),
            h1: block1[25],
            h2: i16::from_le_bytes([block2[0], block2[1]]),
            h3: block2[2],
            h4: (e4 << 4) | (e5 & 0x0F),
            h5: (e6 << 4) | (e5 >> 4),
            h6: block2[6] as i8,
        }
    }

    /// Fine temperature shared by all three compensations
    fn t_fine(&self, adc_t: i32) -> i64 {
        let adc_t = adc_t as i64;
        let t1 = self.t1 as i64;
        let var1 = (((adc_t >> 3) - (t1 << 1)) * self.t2 as i64) >> 11;
        let var2 = (((((adc_t >> 4) - t1) * ((adc_t >> 4) - t1)) >> 12) * self.t3 as i64) >> 14;
        var1 + var2
    }

    /// Temperature in 0.01 °C
    fn temperature(&self, t_fine: i64) -> i64 {
        (t_fine * 5 + 128) >> 8
    }

    /// Pressure in Pa as unsigned Q24.8
    fn pressure(&self, t_fine: i64, adc_p: i32) -> i64 {
        let mut var1 = t_fine - 128_000;
        let mut var2 = var1 * var1 * self.p6 as i64;
        var2 += (var1 * self.p5 as i64) << 17;
        var2 += (self.p4 as i64) << 35;
        var1 = ((var1 * var1 * self.p3 as i64) >> 8) + ((var1 * self.p2 as i64) << 12);
        var1 = (((1i64 << 47) + var1) * self.p1 as i64) >> 33;
        if var1 == 0 {
            return 0;
        }

        let mut p = 1_048_576 - adc_p as i64;
        p = (((p << 31) - var2) * 3125) / var1;
        let var1 = (self.p9 as i64 * (p >> 13) * (p >> 13)) >> 25;
        let var2 = (self.p8 as i64 * p) >> 19;
        ((p + var1 + var2) >> 8) + ((self.p7 as i64) << 4)
    }

    /// Relative humidity in %RH as unsigned Q22.10
    fn humidity(&self, t_fine: i64, adc_h: i32) -> i64 {
        let adc_h = adc_h as i64;
        let mut v = t_fine - 76_800;
        v = ((((adc_h << 14) - ((self.h4 as i64) << 20) - (self.h5 as i64 * v)) + 16_384) >> 15)
            * (((((((v * self.h6 as i64) >> 10) * (((v * self.h3 as i64) >> 11) + 32_768))
                >> 10)
                + 2_097_152)
                * self.h2 as i64
                + 8_192)
                >> 14);
        v -= ((((v >> 15) * (v >> 15)) >> 7) * self.h1 as i64) >> 4;
        v.clamp(0, 419_430_400) >> 12
    }

    /// Convert raw ADC values into a [`Measurement`]
    pub fn compensate(&self, raw: RawSample) -> Measurement {
        let t_fine = self.t_fine(raw.temperature);
        let centi_celsius = self.temperature(t_fine);
        let pressure_q24_8 = self.pressure(t_fine, raw.pressure);
        let humidity_q22_10 = self.humidity(t_fine, raw.humidity);

        Measurement {
            temperature: (centi_celsius * 10) as i32,
            humidity: ((humidity_q22_10 * 100) >> 10) as i32,
            pressure: pressure_q24_8 * 1000 / 256,
        }
    }
}

/// BME280 on an async I2C bus
pub struct Bme280<I2C> {
    i2c: I2C,
    address: u8,
    calibration: Option<Calibration>,
}

impl<I2C: I2c> Bme280<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            calibration: None,
        }
    }

    /// Check the chip ID, load calibration and start normal mode
    pub async fn init(&mut self) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        self.read_regs(REG_CHIP_ID, &mut id).await?;
        if id[0] != CHIP_ID {
            return Err(SensorError::NotDetected);
        }

        let mut block1 = [0u8; CALIB_BLOCK1_LEN];
        let mut block2 = [0u8; CALIB_BLOCK2_LEN];
        self.read_regs(REG_CALIB_00, &mut block1).await?;
        self.read_regs(REG_CALIB_26, &mut block2).await?;
        self.calibration = Some(Calibration::from_registers(&block1, &block2));

        // ctrl_hum only takes effect after a write to ctrl_meas
        self.write_reg(REG_CTRL_HUM, CTRL_HUM_OSRS_X1).await?;
        self.write_reg(REG_CONFIG, CONFIG_DEFAULT).await?;
        self.write_reg(REG_CTRL_MEAS, CTRL_MEAS_NORMAL_X1).await?;
        Ok(())
    }

    /// Burst-read the data registers and compensate them
    pub async fn measure(&mut self) -> Result<Measurement, SensorError> {
        let calibration = self.calibration.ok_or(SensorError::NotDetected)?;

        let mut data = [0u8; DATA_LEN];
        self.read_regs(REG_PRESS_MSB, &mut data).await?;
        Ok(calibration.compensate(RawSample::from_registers(&data)))
    }

    /// Release the bus
    pub fn release(self) -> I2C {
        self.i2c
    }

    async fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        self.i2c
            .write_read(self.address, &[reg], buf)
            .await
            .map_err(|_| SensorError::Bus)
    }

    async fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[reg, value])
            .await
            .map_err(|_| SensorError::Bus)
    }
}

impl<I2C: I2c> SensorReader for Bme280<I2C> {
    async fn connect(&mut self) -> bool {
        match self.init().await {
            Ok(()) => {
                log::info!("BME280: ready at 0x{:02x}", self.address);
                true
            }
            Err(e) => {
                log::error!("BME280: {} at 0x{:02x}", e, self.address);
                false
            }
        }
    }

    async fn read(&mut self) -> Result<Measurement, SensorError> {
        self.measure().await
    }
}
