/// Sensor drivers and the trait the monitor polls them through
pub mod bme280;
pub mod dht11;
pub mod sht21;

pub use bme280::Bme280;
pub use dht11::Dht11;
pub use sht21::Sht21;

use embedded_hal::i2c::ErrorKind;
use log::{debug, warn};

use crate::error::ReadError;
use crate::models::{Addressing, Measurement, Quantity};

/// A polled environmental sensor.
///
/// Implementors provide [`Sensor::try_read`]; callers normally use
/// [`Sensor::read`], which never fails and reports problems through
/// [`Measurement::is_valid`] instead.
pub trait Sensor {
    /// Stable identifier, unique among the sensors of one monitor.
    fn name(&self) -> &str;

    /// Model name, e.g. `"DHT11"`.
    fn type_name(&self) -> &'static str;

    /// Quantities every valid measurement carries, in column order.
    fn fields(&self) -> &'static [Quantity];

    /// How the sensor was wired when it was constructed.
    fn options(&self) -> Addressing;

    /// One protocol attempt. No retries.
    fn try_read(&mut self) -> Result<Vec<(Quantity, f64)>, ReadError>;

    fn read(&mut self) -> Measurement {
        match self.try_read() {
            Ok(values) => Measurement::valid(self.name(), values),
            Err(e) => {
                warn!("{}: invalid reading: {}", self.name(), e);
                Measurement::invalid(self.name())
            }
        }
    }

    /// Whether the sensor answers at all.
    ///
    /// Probing empty locations is expected to fail, so failures are only
    /// logged at debug level.
    fn detect(&mut self) -> bool {
        match self.try_read() {
            Ok(_) => true,
            Err(e) => {
                debug!("{}: not detected: {}", self.name(), e);
                false
            }
        }
    }
}

impl<S: Sensor + ?Sized> Sensor for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }

    fn fields(&self) -> &'static [Quantity] {
        (**self).fields()
    }

    fn options(&self) -> Addressing {
        (**self).options()
    }

    fn try_read(&mut self) -> Result<Vec<(Quantity, f64)>, ReadError> {
        (**self).try_read()
    }

    fn read(&mut self) -> Measurement {
        (**self).read()
    }

    fn detect(&mut self) -> bool {
        (**self).detect()
    }
}

/// Map an I2C failure onto the read error vocabulary.
pub(crate) fn bus_error<E: embedded_hal::i2c::Error>(e: E) -> ReadError {
    match e.kind() {
        ErrorKind::NoAcknowledge(_) => ReadError::AckMissing,
        kind => ReadError::Bus(format!("{:?}", kind)),
    }
}

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
