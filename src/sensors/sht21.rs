/// SHT21 temperature and humidity sensor on a two-wire bus
///
/// Works over any [`I2c`] implementation: the kernel bus or
/// [`crate::bus::SoftwareBus`] on two free GPIO lines. Measurements use
/// the "no hold master" commands, so the sensor never has to stretch the
/// clock; the driver waits out the conversion time instead.
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::debug;

use super::{bus_error, round1, Sensor};
use crate::checksum;
use crate::error::{ConfigError, ReadError};
use crate::models::{Addressing, Quantity};

/// Fixed device address.
pub const SHT21_ADDRESS: u8 = 0x40;

const SOFT_RESET: u8 = 0xFE;
const TRIGGER_TEMPERATURE: u8 = 0xF3;
const TRIGGER_HUMIDITY: u8 = 0xF5;
const READ_ID_FIRST: [u8; 2] = [0xFA, 0x0F];
const READ_ID_SECOND: [u8; 2] = [0xFC, 0xC9];

const RESET_TIME_MS: u32 = 50;
const TEMPERATURE_TIME_MS: u32 = 86;
const HUMIDITY_TIME_MS: u32 = 30;

/// The two low bits of a measurement are status flags.
const STATUS_MASK: u16 = 0xFFFC;

const FIELDS: &[Quantity] = &[Quantity::Temperature, Quantity::Humidity];

pub struct Sht21<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    wiring: Addressing,
    name: String,
}

impl<I2C: I2c, D: DelayNs> Sht21<I2C, D> {
    /// Identify the sensor on `i2c`.
    ///
    /// `wiring` records how the bus was obtained. On a hardware bus its
    /// address is used, otherwise the fixed [`SHT21_ADDRESS`].
    pub fn new(i2c: I2C, delay: D, wiring: Addressing) -> Result<Self, ConfigError> {
        let address = match wiring {
            Addressing::Bus { address, .. } => address,
            _ => SHT21_ADDRESS,
        };
        if address != SHT21_ADDRESS {
            return Err(ConfigError::InvalidAddress {
                sensor: "SHT21",
                address,
            });
        }

        let mut sensor = Sht21 {
            i2c,
            delay,
            address,
            wiring,
            name: String::new(),
        };
        let serial = sensor
            .electronic_id()
            .map_err(|e| ConfigError::NoDevice(format!("SHT21 on {} ({})", wiring, e)))?;
        sensor.name = format!("SHT21_{}", serial);
        debug!("Found {} on {}", sensor.name, wiring);

        Ok(sensor)
    }

    pub fn soft_reset(&mut self) -> Result<(), ReadError> {
        self.i2c
            .write(self.address, &[SOFT_RESET])
            .map_err(bus_error)?;
        self.delay.delay_ms(RESET_TIME_MS);
        Ok(())
    }

    /// The 64-bit serial number as hex, SNA then SNB then SNC.
    pub fn electronic_id(&mut self) -> Result<String, ReadError> {
        self.soft_reset()?;

        // SNB_3, CRC, SNB_2, CRC, SNB_1, CRC, SNB_0, CRC
        let mut first = [0u8; 8];
        self.i2c
            .write_read(self.address, &READ_ID_FIRST, &mut first)
            .map_err(bus_error)?;
        let mut snb = 0u32;
        for pair in first.chunks_exact(2) {
            checksum::verify_crc8(&pair[..1], pair[1])?;
            snb = (snb << 8) | u32::from(pair[0]);
        }

        // SNC_1, SNC_0, CRC, SNA_1, SNA_0, CRC
        let mut second = [0u8; 6];
        self.i2c
            .write_read(self.address, &READ_ID_SECOND, &mut second)
            .map_err(bus_error)?;
        checksum::verify_crc8(&second[0..2], second[2])?;
        checksum::verify_crc8(&second[3..5], second[5])?;
        let snc = u16::from_be_bytes([second[0], second[1]]);
        let sna = u16::from_be_bytes([second[3], second[4]]);

        Ok(format!("{:04x}{:08x}{:04x}", sna, snb, snc))
    }

    /// Temperature in °C, one decimal.
    pub fn read_temperature(&mut self) -> Result<f64, ReadError> {
        let raw = self.measure(TRIGGER_TEMPERATURE, TEMPERATURE_TIME_MS)?;
        Ok(round1(-46.82 + (175.72 * f64::from(raw)) / 65536.0))
    }

    /// Relative humidity in %, one decimal, never above 100.
    pub fn read_humidity(&mut self) -> Result<f64, ReadError> {
        let raw = self.measure(TRIGGER_HUMIDITY, HUMIDITY_TIME_MS)?;
        let rh = -6.0 + (125.0 * f64::from(raw)) / 65536.0;
        Ok(round1(rh.min(100.0)))
    }

    fn measure(&mut self, command: u8, conversion_ms: u32) -> Result<u16, ReadError> {
        self.i2c
            .write(self.address, &[command])
            .map_err(bus_error)?;
        self.delay.delay_ms(conversion_ms);

        let mut data = [0u8; 3];
        self.i2c
            .read(self.address, &mut data)
            .map_err(bus_error)?;
        checksum::verify_crc8(&data[..2], data[2])?;

        Ok(u16::from_be_bytes([data[0], data[1]]) & STATUS_MASK)
    }
}

impl<I2C: I2c, D: DelayNs> Sensor for Sht21<I2C, D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "SHT21"
    }

    fn fields(&self) -> &'static [Quantity] {
        FIELDS
    }

    fn options(&self) -> Addressing {
        self.wiring
    }

    fn try_read(&mut self) -> Result<Vec<(Quantity, f64)>, ReadError> {
        self.soft_reset()?;
        let temperature = self.read_temperature()?;
        let humidity = self.read_humidity()?;
        Ok(vec![
            (Quantity::Temperature, temperature),
            (Quantity::Humidity, humidity),
        ])
    }
}
