//! Environmental sensor acquisition for single-board computers.
//!
//! Reads DHT11 sensors over a single-wire pulse protocol, SHT21 sensors over
//! a software or kernel two-wire bus, and BME280 sensors over I2C, and turns
//! the raw signals into validated, compensated measurements.
pub mod bus;
pub mod checksum;
pub mod compensation;
pub mod config;
pub mod error;
pub mod hal;
pub mod models;
pub mod monitor;
pub mod pulse;
pub mod sensors;
pub mod utils;

pub use error::{ConfigError, ReadError};
pub use models::{Addressing, Measurement, Quantity};
pub use monitor::SensorMonitor;
pub use sensors::Sensor;
