use std::collections::BTreeMap;
use std::fmt;

/// A physical quantity a sensor can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quantity {
    /// Degrees Celsius
    Temperature,
    /// Relative humidity in percent
    Humidity,
    /// Hectopascal
    Pressure,
}

impl Quantity {
    /// Short field name used in log columns.
    pub fn as_str(self) -> &'static str {
        match self {
            Quantity::Temperature => "temp",
            Quantity::Humidity => "hum",
            Quantity::Pressure => "pres",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one sensor read.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub sensor_name: String,
    pub is_valid: bool,
    pub fields: BTreeMap<Quantity, f64>,
}

impl Measurement {
    pub fn valid(sensor_name: &str, values: impl IntoIterator<Item = (Quantity, f64)>) -> Self {
        Measurement {
            sensor_name: sensor_name.to_string(),
            is_valid: true,
            fields: values.into_iter().collect(),
        }
    }

    /// A read that produced nothing usable. Carries no values at all.
    pub fn invalid(sensor_name: &str) -> Self {
        Measurement {
            sensor_name: sensor_name.to_string(),
            is_valid: false,
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, quantity: Quantity) -> Option<f64> {
        if !self.is_valid {
            return None;
        }
        self.fields.get(&quantity).copied()
    }
}

/// How a sensor is wired to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// A single GPIO line, BCM numbering.
    Pin(u8),
    /// A hardware I2C bus and the device address on it.
    Bus { bus: u8, address: u8 },
    /// Two GPIO lines driven as a software two-wire bus.
    SoftBus { scl: u8, sda: u8 },
}

impl fmt::Display for Addressing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Addressing::Pin(pin) => write!(f, "GPIO{}", pin),
            Addressing::Bus { bus, address } => write!(f, "i2c-{} {:#04x}", bus, address),
            Addressing::SoftBus { scl, sda } => write!(f, "GPIO{} (SCL) / GPIO{} (SDA)", scl, sda),
        }
    }
}
