/// Line sampling for the single-wire pulse protocol
use embedded_hal::delay::DelayNs;
use log::debug;

use crate::error::ReadError;
use crate::hal::{Line, PinState};

/// One stretch of constant level on the line, measured in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub level: PinState,
    pub ticks: u32,
}

/// Everything the line did during one read, as alternating runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionSample {
    runs: Vec<Run>,
}

impl TransitionSample {
    /// Build a sample from synthetic `(level, ticks)` runs.
    ///
    /// Adjacent runs with the same level are merged, so the result always
    /// alternates.
    pub fn from_runs(runs: impl IntoIterator<Item = (PinState, u32)>) -> Self {
        let mut sample = TransitionSample::default();
        for (level, ticks) in runs {
            match sample.runs.last_mut() {
                Some(last) if last.level == level => last.ticks += ticks,
                _ => sample.runs.push(Run { level, ticks }),
            }
        }
        sample
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Record one more sample. Returns true if the level did not change.
    fn push(&mut self, level: PinState) -> bool {
        match self.runs.last_mut() {
            Some(last) if last.level == level => {
                last.ticks += 1;
                true
            }
            _ => {
                self.runs.push(Run { level, ticks: 1 });
                false
            }
        }
    }
}

/// Timing of the start handshake and of the sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerTiming {
    /// How long the line is held high before the start pulse.
    pub settle_ms: u32,
    /// Length of the low start pulse.
    pub trigger_ms: u32,
    /// Pause between two samples. Zero samples back to back.
    pub sample_period_ns: u32,
    /// Samples without a level change that end the frame.
    pub max_unchanged: u32,
    /// Upper bound on recorded runs before the line is considered noise.
    pub max_runs: usize,
}

impl Default for SamplerTiming {
    fn default() -> Self {
        SamplerTiming {
            settle_ms: 50,
            trigger_ms: 20,
            sample_period_ns: 1_000,
            max_unchanged: 100,
            max_runs: 256,
        }
    }
}

/// Send the start handshake on `line` and record the reply.
///
/// The line is always released (input with pull-up) when this returns,
/// whether or not the read succeeded.
pub fn sample<L, D>(
    line: &mut L,
    delay: &mut D,
    timing: &SamplerTiming,
) -> Result<TransitionSample, ReadError>
where
    L: Line,
    D: DelayNs,
{
    if let Err(e) = send_start(line, delay, timing) {
        let _ = line.release();
        return Err(ReadError::line(e));
    }

    let sample = collect(line, delay, timing)?;
    if sample.len() < 2 {
        debug!("Line stayed at one level for the whole read");
        return Err(ReadError::Quiescence);
    }
    Ok(sample)
}

fn send_start<L: Line, D: DelayNs>(
    line: &mut L,
    delay: &mut D,
    timing: &SamplerTiming,
) -> Result<(), L::Error> {
    line.drive(PinState::High)?;
    delay.delay_ms(timing.settle_ms);

    line.drive(PinState::Low)?;
    delay.delay_ms(timing.trigger_ms);

    line.release()
}

fn collect<L: Line, D: DelayNs>(
    line: &mut L,
    delay: &mut D,
    timing: &SamplerTiming,
) -> Result<TransitionSample, ReadError> {
    let mut sample = TransitionSample::default();
    let mut unchanged = 0u32;

    loop {
        let level = line.level().map_err(ReadError::line)?;
        if sample.push(level) {
            unchanged += 1;
            if unchanged > timing.max_unchanged {
                break;
            }
        } else {
            unchanged = 0;
            if sample.len() > timing.max_runs {
                return Err(ReadError::Oscillation { runs: sample.len() });
            }
        }

        if timing.sample_period_ns > 0 {
            delay.delay_ns(timing.sample_period_ns);
        }
    }

    debug!("Sampled {} runs before the line went quiet", sample.len());
    Ok(sample)
}
