/// Raspberry Pi backend: GPIO lines and I2C buses through rppal
use std::convert::Infallible;

use log::{debug, info, warn};
use rppal::gpio::{Bias, Gpio, IoPin, Level, Mode};
use rppal::hal::Delay;
use rppal::i2c::I2c;

use super::{check_pin, Line, PinState, SpinDelay, NUM_BCM_PINS};
use crate::bus::SoftwareBus;
use crate::config::{SensorKind, SensorEntry, DEFAULT_I2C_BUS};
use crate::error::ConfigError;
use crate::models::Addressing;
use crate::sensors::bme280::BME280_ADDRESS;
use crate::sensors::sht21::SHT21_ADDRESS;
use crate::sensors::{Bme280, Dht11, Sensor, Sht21};

impl Line for IoPin {
    type Error = Infallible;

    fn drive(&mut self, state: PinState) -> Result<(), Self::Error> {
        self.set_mode(Mode::Output);
        self.write(match state {
            PinState::High => Level::High,
            PinState::Low => Level::Low,
        });
        Ok(())
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.set_mode(Mode::Input);
        self.set_bias(Bias::PullUp);
        Ok(())
    }

    fn level(&mut self) -> Result<PinState, Self::Error> {
        Ok(match self.read() {
            Level::High => PinState::High,
            Level::Low => PinState::Low,
        })
    }
}

pub type GpioDht11 = Dht11<IoPin, SpinDelay>;
pub type KernelSht21 = Sht21<I2c, Delay>;
pub type GpioSht21 = Sht21<SoftwareBus<IoPin, SpinDelay>, SpinDelay>;
pub type KernelBme280 = Bme280<I2c>;

/// Owns the GPIO controller and opens sensors on it.
pub struct Board {
    gpio: Gpio,
    bus_delay_us: u32,
}

impl Board {
    pub fn open(bus_delay_us: u32) -> Result<Self, ConfigError> {
        let gpio = Gpio::new().map_err(|e| ConfigError::Gpio(e.to_string()))?;
        Ok(Board { gpio, bus_delay_us })
    }

    fn line(&self, pin: u8) -> Result<IoPin, ConfigError> {
        check_pin(pin)?;
        let pin = self
            .gpio
            .get(pin)
            .map_err(|e| ConfigError::Gpio(format!("GPIO{}: {}", pin, e)))?;
        Ok(pin.into_io(Mode::Input))
    }

    pub fn dht11(&self, pin: u8) -> Result<GpioDht11, ConfigError> {
        let line = self.line(pin)?;
        Dht11::new(line, SpinDelay::new(), pin)
    }

    pub fn sht21_on_bus(&self, bus: u8, address: u8) -> Result<KernelSht21, ConfigError> {
        Sht21::new(open_i2c(bus)?, Delay::new(), Addressing::Bus { bus, address })
    }

    pub fn sht21_on_gpio(&self, scl: u8, sda: u8) -> Result<GpioSht21, ConfigError> {
        let bus = SoftwareBus::new(self.line(scl)?, self.line(sda)?, SpinDelay::new())
            .map_err(|e| ConfigError::Gpio(format!("{:?}", e)))?
            .with_half_period_us(self.bus_delay_us);
        Sht21::new(bus, SpinDelay::new(), Addressing::SoftBus { scl, sda })
    }

    pub fn bme280(&self, bus: u8, address: u8) -> Result<KernelBme280, ConfigError> {
        Bme280::new(open_i2c(bus)?, bus, address)
    }

    /// Try every header pin and keep those with a DHT11 answering.
    pub fn detect_dht11(&self) -> Vec<GpioDht11> {
        let mut found = Vec::new();
        for pin in 0..NUM_BCM_PINS {
            let mut sensor = match self.dht11(pin) {
                Ok(sensor) => sensor,
                Err(e) => {
                    debug!("Skipping GPIO{}: {}", pin, e);
                    continue;
                }
            };
            if sensor.detect() {
                info!("Detected {}", sensor.name());
                found.push(sensor);
            }
        }
        found
    }

    pub fn detect_sht21(&self) -> Option<KernelSht21> {
        probe(self.sht21_on_bus(DEFAULT_I2C_BUS, SHT21_ADDRESS))
    }

    pub fn detect_bme280(&self) -> Option<KernelBme280> {
        probe(self.bme280(DEFAULT_I2C_BUS, BME280_ADDRESS))
    }

    /// Open the sensors one configuration entry stands for.
    ///
    /// Entries without wiring are probed and may yield nothing.
    pub fn build(&self, entry: &SensorEntry) -> Result<Vec<Box<dyn Sensor>>, ConfigError> {
        let sensors: Vec<Box<dyn Sensor>> = match (entry.kind, entry.wiring) {
            (SensorKind::Dht11, Some(Addressing::Pin(pin))) => vec![Box::new(self.dht11(pin)?)],
            (SensorKind::Dht11, None) => self
                .detect_dht11()
                .into_iter()
                .map(|s| Box::new(s) as Box<dyn Sensor>)
                .collect(),
            (SensorKind::Sht21, Some(Addressing::Bus { bus, address })) => {
                vec![Box::new(self.sht21_on_bus(bus, address)?)]
            }
            (SensorKind::Sht21, Some(Addressing::SoftBus { scl, sda })) => {
                vec![Box::new(self.sht21_on_gpio(scl, sda)?)]
            }
            (SensorKind::Sht21, None) => self
                .detect_sht21()
                .into_iter()
                .map(|s| Box::new(s) as Box<dyn Sensor>)
                .collect(),
            (SensorKind::Bme280, Some(Addressing::Bus { bus, address })) => {
                vec![Box::new(self.bme280(bus, address)?)]
            }
            (SensorKind::Bme280, None) => self
                .detect_bme280()
                .into_iter()
                .map(|s| Box::new(s) as Box<dyn Sensor>)
                .collect(),
            (kind, Some(wiring)) => {
                return Err(ConfigError::Parse {
                    key: "SENSORS".into(),
                    reason: format!("{} cannot be wired as {}", kind, wiring),
                })
            }
        };

        if sensors.is_empty() {
            warn!("No {} detected", entry.kind);
        }
        Ok(sensors)
    }
}

fn open_i2c(bus: u8) -> Result<I2c, ConfigError> {
    I2c::with_bus(bus).map_err(|e| ConfigError::Bus(format!("i2c-{}: {}", bus, e)))
}

fn probe<S: Sensor>(result: Result<S, ConfigError>) -> Option<S> {
    match result {
        Ok(sensor) => {
            info!("Detected {}", sensor.name());
            Some(sensor)
        }
        Err(e) => {
            debug!("Probe failed: {}", e);
            None
        }
    }
}
