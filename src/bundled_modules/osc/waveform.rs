use super::OscillatorError;
use crate::dsp::vector_math;
use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// The shape of the signal generated from a phase in `[0, 1)`. Outputs are naive: nothing is
/// band-limited, so every discontinuous shape aliases.
///
/// | Waveform          | Output for phase `p`                          |
/// |-------------------|-----------------------------------------------|
/// | `Sine`            | `sin(2πp)`                                    |
/// | `Square`          | `sign(sin(2πp))`, exactly -1, 0 or 1          |
/// | `Sawtooth`        | `1 - 2p`                                      |
/// | `InverseSawtooth` | `2p - 1`                                      |
/// | `Triangle`        | `4p - 1` below 0.5, `3 - 4p` from there       |
/// | `Pulse`           | `8p - 1` below 0.25, `-8p - 1` below 0.5, `-1` after |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    InverseSawtooth,
    Triangle,
    Pulse,
}

impl Waveform {
    pub const ALL: [Waveform; 6] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::InverseSawtooth,
        Waveform::Triangle,
        Waveform::Pulse,
    ];

    /// Name used in layout files.
    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::InverseSawtooth => "inverse sawtooth",
            Waveform::Triangle => "triangle",
            Waveform::Pulse => "pulse",
        }
    }

    /// Writes the amplitude for every phase of `phases` into `dst`.
    pub fn shape(&self, dst: &mut [f32], phases: &[f32]) {
        vector_math::copy(dst, phases);
        self.shape_in_place(dst);
    }

    /// Replaces the phases held in `buf` with their amplitudes.
    pub fn shape_in_place(&self, buf: &mut [f32]) {
        match self {
            Waveform::Sine => {
                vector_math::mul_scalar(buf, TAU);
                vector_math::sin(buf);
            }
            Waveform::Square => buf.iter_mut().for_each(|x| *x = square(*x)),
            Waveform::Sawtooth => {
                vector_math::mul_scalar(buf, -2.0);
                vector_math::add_scalar(buf, 1.0);
            }
            Waveform::InverseSawtooth => {
                vector_math::mul_scalar(buf, 2.0);
                vector_math::add_scalar(buf, -1.0);
            }
            Waveform::Triangle => buf.iter_mut().for_each(|x| *x = triangle(*x)),
            Waveform::Pulse => buf.iter_mut().for_each(|x| *x = pulse(*x)),
        }
    }
}

// Zero crossings are found on the phase: `sin(2π·0.5)` is not zero in single precision.
#[inline]
fn square(phase: f32) -> f32 {
    let p = phase - phase.floor();
    if p == 0.0 || p == 0.5 {
        0.0
    } else {
        (TAU * p).sin().signum()
    }
}

#[inline]
fn triangle(phase: f32) -> f32 {
    if phase < 0.5 {
        4.0 * phase - 1.0
    } else {
        3.0 - 4.0 * phase
    }
}

// The second segment falls from -3 to -5 instead of returning to -1. Kept for
// compatibility with existing renders.
#[inline]
fn pulse(phase: f32) -> f32 {
    if phase < 0.25 {
        8.0 * phase - 1.0
    } else if phase < 0.5 {
        -8.0 * phase - 1.0
    } else {
        -1.0
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Waveform {
    type Err = OscillatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Waveform::ALL
            .into_iter()
            .find(|waveform| waveform.name() == s)
            .ok_or_else(|| OscillatorError::UnknownWaveform(s.to_string()))
    }
}
