//! Two-wire bus master bit-banged over two GPIO lines.
//!
//! Both lines are used open-drain style: a one is sent by releasing the line
//! to its pull-up, a zero by driving it low. The peer samples data while the
//! clock is released.
//!
//! Limitation: clock stretching is not supported. After releasing the clock
//! the master waits one half period and carries on without checking that a
//! slow peer has let the line go high.
use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{self, ErrorKind, I2c, NoAcknowledgeSource, Operation};
use log::debug;
use thiserror::Error;

use crate::hal::{Line, PinState};

pub const DEFAULT_HALF_PERIOD_US: u32 = 100;

/// Longest half period accepted from configuration.
pub const MAX_HALF_PERIOD_US: u32 = 10_000;

#[derive(Debug, Error)]
pub enum BusError<E> {
    #[error("no acknowledge ({0:?})")]
    NoAcknowledge(NoAcknowledgeSource),
    #[error("line error: {0:?}")]
    Line(E),
}

impl<E: Debug> i2c::Error for BusError<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            BusError::NoAcknowledge(source) => ErrorKind::NoAcknowledge(*source),
            BusError::Line(_) => ErrorKind::Other,
        }
    }
}

pub struct SoftwareBus<L, D> {
    scl: L,
    sda: L,
    delay: D,
    half_period_us: u32,
}

impl<L, D> SoftwareBus<L, D>
where
    L: Line,
    D: DelayNs,
{
    /// Take ownership of the clock and data lines and leave the bus idle.
    pub fn new(mut scl: L, mut sda: L, delay: D) -> Result<Self, L::Error> {
        scl.release()?;
        sda.release()?;
        Ok(SoftwareBus {
            scl,
            sda,
            delay,
            half_period_us: DEFAULT_HALF_PERIOD_US,
        })
    }

    pub fn with_half_period_us(mut self, half_period_us: u32) -> Self {
        self.half_period_us = half_period_us;
        self
    }

    /// Give the lines and the delay back.
    pub fn free(self) -> (L, L, D) {
        (self.scl, self.sda, self.delay)
    }

    fn wait(&mut self, half_periods: u32) {
        self.delay.delay_us(self.half_period_us.saturating_mul(half_periods));
    }

    /// Start condition: data falls while the clock is high.
    pub fn start(&mut self) -> Result<(), L::Error> {
        self.scl.release()?;
        self.sda.release()?;
        self.wait(2);
        self.sda.drive(PinState::Low)?;
        self.wait(2);
        self.scl.drive(PinState::Low)
    }

    /// Stop condition: data rises while the clock is high. Leaves both lines
    /// released.
    pub fn stop(&mut self) -> Result<(), L::Error> {
        self.sda.drive(PinState::Low)?;
        self.wait(2);
        self.scl.release()?;
        self.wait(2);
        self.sda.release()?;
        self.wait(2);
        Ok(())
    }

    /// Shift out one byte, MSB first, and report whether the peer acked it.
    pub fn write_byte(&mut self, byte: u8) -> Result<bool, L::Error> {
        for bit in (0..8).rev() {
            if byte & (1 << bit) != 0 {
                self.sda.release()?;
            } else {
                self.sda.drive(PinState::Low)?;
            }
            self.wait(1);
            self.scl.release()?;
            self.wait(1);
            self.scl.drive(PinState::Low)?;
            self.wait(1);
        }

        self.sda.release()?;
        self.wait(1);
        self.scl.release()?;
        self.wait(1);
        let ack = self.sda.level()? == PinState::Low;
        self.scl.drive(PinState::Low)?;
        self.wait(1);

        Ok(ack)
    }

    /// Shift in one byte, MSB first, then send our ack (`true`) or nack.
    pub fn read_byte(&mut self, ack: bool) -> Result<u8, L::Error> {
        let mut byte = 0u8;
        for _ in 0..8 {
            self.wait(1);
            self.scl.release()?;
            self.wait(1);
            byte = (byte << 1) | u8::from(self.sda.level()? == PinState::High);
            self.scl.drive(PinState::Low)?;
        }

        if ack {
            self.sda.drive(PinState::Low)?;
        } else {
            self.sda.release()?;
        }
        self.wait(1);
        self.scl.release()?;
        self.wait(1);
        self.scl.drive(PinState::Low)?;
        self.wait(1);
        self.sda.release()?;

        Ok(byte)
    }

    fn run(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), BusError<L::Error>> {
        let mut previous: Option<bool> = None;

        for i in 0..operations.len() {
            let is_read = matches!(operations[i], Operation::Read(_));
            let read_continues = matches!(operations.get(i + 1), Some(Operation::Read(_)));

            if previous != Some(is_read) {
                self.start().map_err(BusError::Line)?;
                let frame = (address << 1) | u8::from(is_read);
                if !self.write_byte(frame).map_err(BusError::Line)? {
                    debug!("No ack for address {:#04x}", address);
                    return Err(BusError::NoAcknowledge(NoAcknowledgeSource::Address));
                }
            }

            match &mut operations[i] {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        if !self.write_byte(byte).map_err(BusError::Line)? {
                            debug!("No ack for data byte {:#04x}", byte);
                            return Err(BusError::NoAcknowledge(NoAcknowledgeSource::Data));
                        }
                    }
                }
                Operation::Read(buffer) => {
                    let len = buffer.len();
                    for (n, byte) in buffer.iter_mut().enumerate() {
                        let last = n + 1 == len && !read_continues;
                        *byte = self.read_byte(!last).map_err(BusError::Line)?;
                    }
                }
            }

            previous = Some(is_read);
        }

        Ok(())
    }
}

impl<L, D> i2c::ErrorType for SoftwareBus<L, D>
where
    L: Line,
{
    type Error = BusError<L::Error>;
}

impl<L, D> I2c for SoftwareBus<L, D>
where
    L: Line,
    D: DelayNs,
{
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if operations.is_empty() {
            return Ok(());
        }

        let result = self.run(address, operations);
        let stopped = self.stop().map_err(BusError::Line);
        result.and(stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::fake::{self, Event, FakeLine, Op, Trace};
    use crate::hal::PinState::{High, Low};
    use embedded_hal_mock::eh1::delay::NoopDelay;

    fn bus(trace: &Trace, sda_replies: Vec<PinState>) -> SoftwareBus<FakeLine, NoopDelay> {
        let scl = FakeLine::new("scl", trace);
        let sda = FakeLine::new("sda", trace).with_replies(sda_replies);
        SoftwareBus::new(scl, sda, NoopDelay::new()).unwrap()
    }

    fn levels_of(byte: u8) -> Vec<PinState> {
        (0..8)
            .rev()
            .map(|bit| if byte & (1 << bit) != 0 { High } else { Low })
            .collect()
    }

    /// Data level seen by the peer at every rising clock edge.
    fn clocked_data(events: &[Event]) -> Vec<PinState> {
        let mut sda = High;
        let mut seen = Vec::new();
        for event in events {
            match (event.line, event.op) {
                ("sda", Op::Drive(level)) => sda = level,
                ("sda", Op::Release) => sda = High,
                ("scl", Op::Release) => seen.push(sda),
                _ => {}
            }
        }
        seen
    }

    #[test]
    fn start_pulls_data_low_under_high_clock() {
        let trace = fake::trace();
        let mut bus = bus(&trace, Vec::new());
        trace.borrow_mut().clear();

        bus.start().unwrap();

        let ops: Vec<(&str, Op)> = trace.borrow().iter().map(|e| (e.line, e.op)).collect();
        assert_eq!(
            ops,
            vec![
                ("scl", Op::Release),
                ("sda", Op::Release),
                ("sda", Op::Drive(Low)),
                ("scl", Op::Drive(Low)),
            ]
        );
    }

    #[test]
    fn write_byte_shifts_msb_first() {
        let trace = fake::trace();
        let mut bus = bus(&trace, vec![Low]);
        trace.borrow_mut().clear();

        let ack = bus.write_byte(0b1010_0011).unwrap();

        assert!(ack);
        let clocked = clocked_data(&trace.borrow());
        // eight data bits, then the released line during the ack clock
        assert_eq!(clocked[..8], levels_of(0b1010_0011)[..]);
        assert_eq!(clocked[8], High);
    }

    #[test]
    fn missing_ack_is_reported() {
        let trace = fake::trace();
        let mut bus = bus(&trace, Vec::new());

        assert!(!bus.write_byte(0x80).unwrap());
    }

    #[test]
    fn read_byte_samples_on_high_clock() {
        let trace = fake::trace();
        let mut bus = bus(&trace, levels_of(0xA5));
        trace.borrow_mut().clear();

        assert_eq!(bus.read_byte(true).unwrap(), 0xA5);

        // ninth clock carries our ack
        let clocked = clocked_data(&trace.borrow());
        assert_eq!(clocked.len(), 9);
        assert_eq!(clocked[8], Low);
    }

    #[test]
    fn last_read_byte_is_nacked() {
        let trace = fake::trace();
        let mut bus = bus(&trace, levels_of(0x3C));
        trace.borrow_mut().clear();

        assert_eq!(bus.read_byte(false).unwrap(), 0x3C);
        assert_eq!(clocked_data(&trace.borrow())[8], High);
    }

    #[test]
    fn stop_leaves_bus_idle_after_any_transfer() {
        for count in (0..=255usize).step_by(17) {
            let trace = fake::trace();
            // alternate acked and unacked writes with reads of a fixed pattern
            let mut replies = Vec::new();
            for n in 0..count {
                if n % 2 == 0 {
                    replies.push(if n % 4 == 0 { Low } else { High });
                } else {
                    replies.extend(levels_of(n as u8));
                }
            }
            let mut bus = bus(&trace, replies);

            bus.start().unwrap();
            for n in 0..count {
                if n % 2 == 0 {
                    bus.write_byte(n as u8).unwrap();
                } else {
                    assert_eq!(bus.read_byte(n + 1 < count).unwrap(), n as u8);
                }
            }
            bus.stop().unwrap();

            let (scl, sda, _) = bus.free();
            assert!(scl.is_released(), "scl held after {} bytes", count);
            assert!(sda.is_released(), "sda held after {} bytes", count);
        }
    }

    #[test]
    fn huge_half_period_does_not_overflow() {
        let trace = fake::trace();
        let mut bus = bus(&trace, Vec::new()).with_half_period_us(3_000_000_000);

        bus.start().unwrap();
        bus.stop().unwrap();
    }

    #[test]
    fn write_transaction_sends_address_then_data() {
        let trace = fake::trace();
        let mut bus = bus(&trace, vec![Low, Low]);
        trace.borrow_mut().clear();

        bus.write(0x40, &[0xF3]).unwrap();

        let clocked = clocked_data(&trace.borrow());
        // start, 9 clocks per byte, then the stop releasing the clock
        assert_eq!(clocked.len(), 20);
        assert_eq!(clocked[1..9], levels_of(0x40 << 1)[..]);
        assert_eq!(clocked[10..18], levels_of(0xF3)[..]);
        assert_eq!(clocked[19], Low);
        let (scl, sda, _) = bus.free();
        assert!(scl.is_released() && sda.is_released());
    }

    #[test]
    fn write_read_uses_repeated_start() {
        let trace = fake::trace();
        let mut replies = vec![Low, Low, Low];
        replies.extend(levels_of(0x12));
        replies.extend(levels_of(0x34));
        let mut bus = bus(&trace, replies);
        trace.borrow_mut().clear();

        let mut buffer = [0u8; 2];
        bus.write_read(0x76, &[0xD0], &mut buffer).unwrap();

        assert_eq!(buffer, [0x12, 0x34]);
        let clocked = clocked_data(&trace.borrow());
        assert_eq!(clocked[1..9], levels_of(0x76 << 1)[..]);
        // repeated start releases the clock once more before the read address
        assert_eq!(clocked[20..28], levels_of((0x76 << 1) | 1)[..]);
        // first byte acked, last byte nacked
        assert_eq!(clocked[37], Low);
        assert_eq!(clocked[46], High);
        assert_eq!(clocked.len(), 48);
    }

    #[test]
    fn unacknowledged_address_fails_and_frees_bus() {
        let trace = fake::trace();
        let mut bus = bus(&trace, Vec::new());

        let result = bus.write(0x40, &[0xFE]);

        assert!(matches!(
            result,
            Err(BusError::NoAcknowledge(NoAcknowledgeSource::Address))
        ));
        assert_eq!(
            i2c::Error::kind(&result.unwrap_err()),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        let (scl, sda, _) = bus.free();
        assert!(scl.is_released() && sda.is_released());
    }
}
