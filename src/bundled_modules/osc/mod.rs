mod error;
mod phase;
mod pulse_width;
mod waveform;

pub use error::OscillatorError;
pub use phase::PhaseAccumulator;
pub use pulse_width::{warp, warp_in_place, PulseWidth};
pub use waveform::Waveform;
