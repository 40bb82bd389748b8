use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

// Below this the scheduler's sleep granularity is worse than the protocol
// timing, so we spin instead.
const SLEEP_THRESHOLD_NS: u32 = 2_000_000;

/// Delay provider for the bit-banged protocols.
///
/// `std::thread::sleep` is far too coarse for microsecond bit periods, so
/// short waits busy-loop on the monotonic clock. Long waits (the millisecond
/// settle and trigger periods) still sleep.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinDelay;

impl SpinDelay {
    pub fn new() -> Self {
        SpinDelay
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let duration = Duration::from_nanos(u64::from(ns));
        if ns >= SLEEP_THRESHOLD_NS {
            std::thread::sleep(duration);
            return;
        }

        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_at_least_requested_time() {
        let mut delay = SpinDelay::new();

        let start = Instant::now();
        delay.delay_us(200);
        assert!(start.elapsed() >= Duration::from_micros(200));

        let start = Instant::now();
        delay.delay_ms(3);
        assert!(start.elapsed() >= Duration::from_millis(3));
    }
}
