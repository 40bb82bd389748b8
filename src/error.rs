/// Error types for sensor reads and sensor construction
use thiserror::Error;

/// Why a single read produced no usable measurement.
///
/// None of these are fatal: [`crate::sensors::Sensor::read`] collapses every
/// variant into an invalid [`crate::models::Measurement`] and the caller is
/// free to try again on the next poll.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("no usable signal on the line")]
    Quiescence,
    #[error("line still toggling after {runs} transitions")]
    Oscillation { runs: usize },
    #[error("frame error: expected {expected} bits, decoded {found}")]
    Frame { expected: usize, found: usize },
    #[error("checksum mismatch (expected {expected:#04x}, computed {computed:#04x})")]
    ChecksumMismatch { expected: u8, computed: u8 },
    #[error("peer did not acknowledge")]
    AckMissing,
    #[error("bus error: {0}")]
    Bus(String),
    #[error("line error: {0}")]
    Line(String),
}

impl ReadError {
    pub(crate) fn line<E: core::fmt::Debug>(e: E) -> Self {
        ReadError::Line(format!("{:?}", e))
    }
}

/// Fatal problems found while building a sensor or loading configuration.
///
/// A sensor that fails construction should be left out of the monitor
/// entirely, unlike a sensor whose reads merely come back invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no GPIO pin with BCM number {0}")]
    InvalidPin(u8),
    #[error("address {address:#04x} is not supported by {sensor}")]
    InvalidAddress { sensor: &'static str, address: u8 },
    #[error("no {0} responded")]
    NoDevice(String),
    #[error("bus error: {0}")]
    Bus(String),
    #[error("GPIO error: {0}")]
    Gpio(String),
    #[error("invalid setting {key}: {reason}")]
    Parse { key: String, reason: String },
    #[error("{0}")]
    Missing(String),
}
