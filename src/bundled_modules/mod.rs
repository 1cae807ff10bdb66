pub mod osc;
mod oscillator;

pub use crate::bundled_modules::osc::{OscillatorError, Waveform};
pub use crate::bundled_modules::oscillator::{Oscillator, OscillatorBuilder, DEFAULT_MAX_BLOCK_SIZE};

pub mod prelude {
    pub use crate::bundled_modules::osc::{OscillatorError, PulseWidth, Waveform};
    pub use crate::bundled_modules::oscillator::{Oscillator, OscillatorBuilder};
}
