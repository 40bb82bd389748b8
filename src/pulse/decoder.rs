/// Bit recovery from a sampled pulse train
use log::debug;

use super::sampler::TransitionSample;
use crate::error::ReadError;
use crate::hal::PinState;

/// Where the decoder is within the sensor's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InitPullDown,
    InitPullUp,
    DataFirstPullDown,
    DataPullUp,
    DataPullDown,
}

/// Lengths of the high periods that carry data bits.
///
/// The reply opens with a low/high handshake and a first low before the
/// data starts. Each data bit is the high period between two lows; a high
/// period that is never terminated (the idle line at the end) is dropped.
pub fn pull_up_lengths(sample: &TransitionSample) -> Vec<u32> {
    let mut state = State::InitPullDown;
    let mut lengths = Vec::new();
    let mut pending = 0;

    for run in sample.runs() {
        state = match (state, run.level) {
            (State::InitPullDown, PinState::Low) => State::InitPullUp,
            (State::InitPullUp, PinState::High) => State::DataFirstPullDown,
            (State::DataFirstPullDown, PinState::Low) => State::DataPullUp,
            (State::DataPullUp, PinState::High) => {
                pending = run.ticks;
                State::DataPullDown
            }
            (State::DataPullDown, PinState::Low) => {
                lengths.push(pending);
                State::DataPullUp
            }
            (state, _) => state,
        };
    }

    lengths
}

/// Split high-period lengths into short (0) and long (1) bits.
///
/// The threshold sits halfway between the shortest and the longest period
/// of this read, so it follows the sensor's timing drift instead of relying
/// on a fixed tick count.
pub fn classify(lengths: &[u32]) -> Vec<bool> {
    let (Some(&shortest), Some(&longest)) = (lengths.iter().min(), lengths.iter().max()) else {
        return Vec::new();
    };

    let halfway = f64::from(shortest) + f64::from(longest - shortest) / 2.0;
    lengths.iter().map(|&len| f64::from(len) > halfway).collect()
}

/// Pack bits into bytes, most significant bit first.
///
/// Trailing bits that do not fill a whole byte are dropped.
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|byte| byte.iter().fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit)))
        .collect()
}

/// Decode a sample into exactly `expected_bits / 8` bytes.
pub fn decode(sample: &TransitionSample, expected_bits: usize) -> Result<Vec<u8>, ReadError> {
    let lengths = pull_up_lengths(sample);
    if lengths.len() != expected_bits {
        debug!(
            "Decoded {} bits from {} runs, expected {}",
            lengths.len(),
            sample.len(),
            expected_bits
        );
        return Err(ReadError::Frame {
            expected: expected_bits,
            found: lengths.len(),
        });
    }

    Ok(bits_to_bytes(&classify(&lengths)))
}
