/// BME280 temperature, humidity and pressure sensor on a hardware I2C bus
use embedded_hal::i2c::I2c;
use log::debug;

use super::{bus_error, Sensor};
use crate::compensation::Calibration;
use crate::error::{ConfigError, ReadError};
use crate::models::{Addressing, Quantity};

/// SDO tied low.
pub const BME280_ADDRESS: u8 = 0x76;
/// SDO tied high.
pub const BME280_ADDRESS_ALT: u8 = 0x77;

const CHIP_ID: u8 = 0x60;

mod register {
    pub const CALIB_TP: u8 = 0x88;
    pub const CALIB_H1: u8 = 0xA1;
    pub const CHIP_ID: u8 = 0xD0;
    pub const CALIB_H: u8 = 0xE1;
    pub const CTRL_HUM: u8 = 0xF2;
    pub const CTRL_MEAS: u8 = 0xF4;
    pub const CONFIG: u8 = 0xF5;
    pub const DATA: u8 = 0xF7;
}

/// Humidity oversampling x1.
const CTRL_HUM: u8 = 0x01;
/// Temperature and pressure oversampling x1, normal mode.
const CTRL_MEAS: u8 = 0x27;
/// 1000 ms standby, filter off.
const CONFIG: u8 = 0xA0;

const FIELDS: &[Quantity] = &[
    Quantity::Temperature,
    Quantity::Humidity,
    Quantity::Pressure,
];

/// Uncompensated ADC values of one burst read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub pressure: u32,
    pub temperature: u32,
    pub humidity: u32,
}

impl RawSample {
    /// Unpack registers 0xF7..=0xFE. Pressure and temperature are 20 bits.
    pub fn from_registers(data: &[u8; 8]) -> Self {
        let twenty_bits = |i: usize| {
            (u32::from(data[i]) << 12) | (u32::from(data[i + 1]) << 4) | (u32::from(data[i + 2]) >> 4)
        };
        RawSample {
            pressure: twenty_bits(0),
            temperature: twenty_bits(3),
            humidity: (u32::from(data[6]) << 8) | u32::from(data[7]),
        }
    }
}

pub struct Bme280<I2C> {
    i2c: I2C,
    bus: u8,
    address: u8,
    name: String,
    calibration: Calibration,
}

impl<I2C: I2c> Bme280<I2C> {
    /// Check the chip id, configure sampling and load the calibration.
    ///
    /// `bus` is only used for naming; `i2c` must already be that bus.
    pub fn new(i2c: I2C, bus: u8, address: u8) -> Result<Self, ConfigError> {
        if address != BME280_ADDRESS && address != BME280_ADDRESS_ALT {
            return Err(ConfigError::InvalidAddress {
                sensor: "BME280",
                address,
            });
        }
        let location = Addressing::Bus { bus, address };
        let no_device = |e: ReadError| ConfigError::NoDevice(format!("BME280 on {} ({})", location, e));

        let mut i2c = i2c;
        let mut id = [0u8];
        i2c.write_read(address, &[register::CHIP_ID], &mut id)
            .map_err(|e| no_device(bus_error(e)))?;
        if id[0] != CHIP_ID {
            return Err(ConfigError::NoDevice(format!(
                "BME280 on {} (chip id {:#04x})",
                location, id[0]
            )));
        }

        for (reg, value) in [
            (register::CTRL_HUM, CTRL_HUM),
            (register::CTRL_MEAS, CTRL_MEAS),
            (register::CONFIG, CONFIG),
        ] {
            i2c.write(address, &[reg, value])
                .map_err(|e| no_device(bus_error(e)))?;
        }

        let calibration = load_calibration(&mut i2c, address).map_err(no_device)?;
        debug!("BME280 on {}: {:?}", location, calibration);

        Ok(Bme280 {
            i2c,
            bus,
            address,
            name: format!("BME280_i2c-{}_0x{:02x}", bus, address),
            calibration,
        })
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn read_raw(&mut self) -> Result<RawSample, ReadError> {
        let mut data = [0u8; 8];
        self.i2c
            .write_read(self.address, &[register::DATA], &mut data)
            .map_err(bus_error)?;
        Ok(RawSample::from_registers(&data))
    }
}

fn load_calibration<I2C: I2c>(i2c: &mut I2C, address: u8) -> Result<Calibration, ReadError> {
    let mut tp = [0u8; 24];
    let mut h1 = [0u8];
    let mut h = [0u8; 7];
    i2c.write_read(address, &[register::CALIB_TP], &mut tp)
        .map_err(bus_error)?;
    i2c.write_read(address, &[register::CALIB_H1], &mut h1)
        .map_err(bus_error)?;
    i2c.write_read(address, &[register::CALIB_H], &mut h)
        .map_err(bus_error)?;
    Ok(Calibration::from_registers(&tp, h1[0], &h))
}

impl<I2C: I2c> Sensor for Bme280<I2C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "BME280"
    }

    fn fields(&self) -> &'static [Quantity] {
        FIELDS
    }

    fn options(&self) -> Addressing {
        Addressing::Bus {
            bus: self.bus,
            address: self.address,
        }
    }

    fn try_read(&mut self) -> Result<Vec<(Quantity, f64)>, ReadError> {
        let raw = self.read_raw()?;
        let (temperature, fine) = self.calibration.compensate_temperature(raw.temperature);
        let humidity = self.calibration.compensate_humidity(raw.humidity, fine);
        let pressure = self.calibration.compensate_pressure(raw.pressure, fine);

        Ok(vec![
            (Quantity::Temperature, temperature),
            (Quantity::Humidity, humidity),
            (Quantity::Pressure, pressure),
        ])
    }
}
