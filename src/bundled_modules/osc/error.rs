use crate::module::ParameterError;
use thiserror::Error;

/// Errors raised while configuring an [Oscillator](struct@crate::bundled_modules::Oscillator).
/// They all surface at construction (or when a setting is changed), never while processing.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum OscillatorError {
    #[error("Unknown waveform '{0}'")]
    UnknownWaveform(String),
    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f32),
    #[error("Maximum block size must be at least one sample")]
    InvalidBlockSize,
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}
