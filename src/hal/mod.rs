/// Hardware seams: bidirectional GPIO lines and busy-wait delays
pub mod spin;

#[cfg(feature = "rpi")]
pub mod rpi;

#[cfg(test)]
pub(crate) mod fake;

pub use embedded_hal::digital::PinState;
pub use spin::SpinDelay;

use crate::error::ConfigError;

/// GPIO lines on the Raspberry Pi header, BCM 0 included.
pub const NUM_BCM_PINS: u8 = 28;

pub fn check_pin(pin: u8) -> Result<(), ConfigError> {
    if pin >= NUM_BCM_PINS {
        return Err(ConfigError::InvalidPin(pin));
    }
    Ok(())
}

/// A single GPIO line that can either be driven or released to its pull-up.
///
/// Both bit-banged protocols in this crate talk over open-drain style
/// wiring: a released line floats high, and either side may pull it low.
pub trait Line {
    type Error: core::fmt::Debug;

    /// Switch the line to output and drive `state`.
    fn drive(&mut self, state: PinState) -> Result<(), Self::Error>;

    /// Switch the line to input with the pull-up enabled.
    fn release(&mut self) -> Result<(), Self::Error>;

    /// Read the level currently present on the line.
    fn level(&mut self) -> Result<PinState, Self::Error>;
}

impl<L: Line + ?Sized> Line for &mut L {
    type Error = L::Error;

    fn drive(&mut self, state: PinState) -> Result<(), Self::Error> {
        (**self).drive(state)
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        (**self).release()
    }

    fn level(&mut self) -> Result<PinState, Self::Error> {
        (**self).level()
    }
}
