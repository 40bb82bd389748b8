/// DHT11 temperature and humidity sensor on a single GPIO line
use embedded_hal::delay::DelayNs;
use log::debug;

use super::Sensor;
use crate::checksum;
use crate::error::{ConfigError, ReadError};
use crate::hal::{self, Line};
use crate::models::{Addressing, Quantity};
use crate::pulse::{self, SamplerTiming};

/// Humidity, humidity decimal, temperature, temperature decimal, checksum.
const FRAME_BITS: usize = 40;

const FIELDS: &[Quantity] = &[Quantity::Temperature, Quantity::Humidity];

pub struct Dht11<L, D> {
    line: L,
    delay: D,
    pin: u8,
    name: String,
    timing: SamplerTiming,
}

impl<L: Line, D: DelayNs> Dht11<L, D> {
    /// Wrap an already opened line. `pin` is its BCM number.
    pub fn new(line: L, delay: D, pin: u8) -> Result<Self, ConfigError> {
        hal::check_pin(pin)?;
        Ok(Dht11 {
            line,
            delay,
            pin,
            name: format!("DHT11_PIN{}", pin),
            timing: SamplerTiming::default(),
        })
    }

    pub fn with_timing(mut self, timing: SamplerTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Run the handshake and return the checked five-byte frame.
    pub fn read_frame(&mut self) -> Result<Vec<u8>, ReadError> {
        let sample = pulse::sample(&mut self.line, &mut self.delay, &self.timing)?;
        let frame = pulse::decode(&sample, FRAME_BITS)?;
        checksum::verify_additive(&frame)?;
        debug!("{}: frame {:02x?}", self.name, frame);
        Ok(frame)
    }
}

impl<L: Line, D: DelayNs> Sensor for Dht11<L, D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "DHT11"
    }

    fn fields(&self) -> &'static [Quantity] {
        FIELDS
    }

    fn options(&self) -> Addressing {
        Addressing::Pin(self.pin)
    }

    fn try_read(&mut self) -> Result<Vec<(Quantity, f64)>, ReadError> {
        let frame = self.read_frame()?;
        // the decimal bytes are always zero on this part
        Ok(vec![
            (Quantity::Temperature, f64::from(frame[2])),
            (Quantity::Humidity, f64::from(frame[0])),
        ])
    }
}
