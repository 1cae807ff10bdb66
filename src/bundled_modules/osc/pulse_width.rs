use crate::dsp::vector_math;

/// Duty cycle used by the pulse width warp. It can either stay fixed for the whole block or
/// change on every sample (audio-rate duty modulation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PulseWidth<'a> {
    Constant(f32),
    PerSample(&'a [f32]),
}

impl<'a> PulseWidth<'a> {
    /// Width at which the warp leaves the phase untouched.
    pub const CENTERED: f32 = 0.5;

    /// Whether the whole block can skip the warp. Only a constant width of 0.5 qualifies;
    /// per-sample widths are checked sample by sample.
    pub fn is_identity(&self) -> bool {
        matches!(self, PulseWidth::Constant(width) if *width == Self::CENTERED)
    }
}

/// Remaps unit-interval phases around the pulse width. The part of the cycle below the width
/// is stretched by `phase / width`, the rest by `(phase - width) / (1 - width)`.
///
/// A constant width of exactly 0.5 leaves the phase untouched. Per-sample widths always go
/// through the formula, so a modulated width moves smoothly through 0.5.
///
/// `phases` must already be wrapped into `[0, 1)`. Widths are not clamped: values outside
/// `[0, 1]` give non-finite or out-of-range phases.
pub fn warp(dst: &mut [f32], phases: &[f32], width: PulseWidth) {
    match width {
        PulseWidth::Constant(width) if width == PulseWidth::CENTERED => {
            vector_math::copy(dst, phases)
        }
        PulseWidth::Constant(width) => dst
            .iter_mut()
            .zip(phases)
            .for_each(|(d, phase)| *d = warp_sample(*phase, width)),
        PulseWidth::PerSample(widths) => dst
            .iter_mut()
            .zip(phases.iter().zip(widths))
            .for_each(|(d, (phase, width))| *d = warp_sample(*phase, *width)),
    }
}

/// Same as [warp] over a buffer already holding the phases.
pub fn warp_in_place(buf: &mut [f32], width: PulseWidth) {
    match width {
        PulseWidth::Constant(width) if width == PulseWidth::CENTERED => {}
        PulseWidth::Constant(width) => buf
            .iter_mut()
            .for_each(|phase| *phase = warp_sample(*phase, width)),
        PulseWidth::PerSample(widths) => buf
            .iter_mut()
            .zip(widths)
            .for_each(|(phase, width)| *phase = warp_sample(*phase, *width)),
    }
}

#[inline]
fn warp_sample(phase: f32, width: f32) -> f32 {
    if phase < width {
        phase / width
    } else {
        (phase - width) / (1.0 - width)
    }
}
