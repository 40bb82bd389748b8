pub mod decoder;
pub mod sampler;

pub use decoder::{bits_to_bytes, classify, decode, pull_up_lengths};
pub use sampler::{sample, Run, SamplerTiming, TransitionSample};
