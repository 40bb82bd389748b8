use std::env;
use std::fmt;

use log::{debug, info};

use crate::error::ConfigError;
use crate::models::Addressing;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Bus 1 is the one exposed on the Raspberry Pi header.
pub const DEFAULT_I2C_BUS: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Dht11,
    Sht21,
    Bme280,
}

impl SensorKind {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "DHT11" => Some(SensorKind::Dht11),
            "SHT21" => Some(SensorKind::Sht21),
            "BME280" => Some(SensorKind::Bme280),
            _ => None,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SensorKind::Dht11 => "DHT11",
            SensorKind::Sht21 => "SHT21",
            SensorKind::Bme280 => "BME280",
        })
    }
}

/// One entry of the `SENSORS` list.
///
/// `wiring` is `None` when the sensor should be found by probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorEntry {
    pub kind: SensorKind,
    pub wiring: Option<Addressing>,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub sensors: Vec<SensorEntry>,
    pub poll_interval_secs: u64,
    pub bus_delay_us: u32,
}

impl MonitorConfig {
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let list = lookup("SENSORS")
            .ok_or_else(|| ConfigError::Missing("SENSORS environment variable not set".into()))?;
        let sensors = parse_sensor_list(&list)?;

        let poll_interval_secs = match lookup("POLL_INTERVAL_SECS") {
            Some(value) => parse_number("POLL_INTERVAL_SECS", &value)?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };
        if poll_interval_secs == 0 {
            return Err(ConfigError::Parse {
                key: "POLL_INTERVAL_SECS".into(),
                reason: "must be at least 1".into(),
            });
        }

        let bus_delay_us = match lookup("BUS_DELAY_US") {
            Some(value) => parse_number("BUS_DELAY_US", &value)?,
            None => crate::bus::DEFAULT_HALF_PERIOD_US,
        };
        if bus_delay_us == 0 || bus_delay_us > crate::bus::MAX_HALF_PERIOD_US {
            return Err(ConfigError::Parse {
                key: "BUS_DELAY_US".into(),
                reason: format!("must be between 1 and {}", crate::bus::MAX_HALF_PERIOD_US),
            });
        }

        info!(
            "Loaded {} sensor entries, polling every {} s",
            sensors.len(),
            poll_interval_secs
        );
        Ok(MonitorConfig {
            sensors,
            poll_interval_secs,
            bus_delay_us,
        })
    }
}

/// Parse `TYPE[=OPTIONS]` entries separated by commas.
///
/// * `DHT11=4` - BCM pin
/// * `SHT21=1:0x40`, `BME280=1:0x76` - hardware bus and address
/// * `SHT21=gpio:3:2` - software bus on SCL and SDA pins
/// * a bare type probes the default locations
pub fn parse_sensor_list(list: &str) -> Result<Vec<SensorEntry>, ConfigError> {
    let mut sensors = Vec::new();

    for entry in list.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        debug!("Processing sensor entry: '{}'", entry);

        let (kind, options) = match entry.split_once('=') {
            Some((kind, options)) => (kind.trim(), Some(options.trim())),
            None => (entry, None),
        };
        let kind = SensorKind::parse(kind).ok_or_else(|| ConfigError::Parse {
            key: "SENSORS".into(),
            reason: format!("unknown sensor type '{}'", kind),
        })?;

        let wiring = match options {
            Some(options) => Some(parse_wiring(kind, options)?),
            None => None,
        };
        sensors.push(SensorEntry { kind, wiring });
    }

    if sensors.is_empty() {
        return Err(ConfigError::Missing("SENSORS lists no sensors".into()));
    }
    Ok(sensors)
}

fn parse_wiring(kind: SensorKind, options: &str) -> Result<Addressing, ConfigError> {
    let parts: Vec<&str> = options.split(':').map(str::trim).collect();
    let invalid = || ConfigError::Parse {
        key: "SENSORS".into(),
        reason: format!("'{}' is not valid wiring for {}", options, kind),
    };

    match (kind, parts.as_slice()) {
        (SensorKind::Dht11, [pin]) => Ok(Addressing::Pin(parse_number("SENSORS", pin)?)),
        (SensorKind::Sht21, [gpio, scl, sda]) if gpio.eq_ignore_ascii_case("gpio") => {
            Ok(Addressing::SoftBus {
                scl: parse_number("SENSORS", scl)?,
                sda: parse_number("SENSORS", sda)?,
            })
        }
        (SensorKind::Sht21 | SensorKind::Bme280, [bus, address]) => Ok(Addressing::Bus {
            bus: parse_number("SENSORS", bus)?,
            address: parse_address(address)?,
        }),
        _ => Err(invalid()),
    }
}

/// Accepts `0x76` as well as plain decimal.
fn parse_address(text: &str) -> Result<u8, ConfigError> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).map_err(|e| e.to_string()),
        None => text.parse::<u8>().map_err(|e| e.to_string()),
    };
    parsed.map_err(|reason| ConfigError::Parse {
        key: "SENSORS".into(),
        reason: format!("bad address '{}': {}", text, reason),
    })
}

fn parse_number<T>(key: &str, text: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    text.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
        key: key.to_string(),
        reason: format!("'{}': {}", text, e),
    })
}
