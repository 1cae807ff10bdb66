use crate::dsp::vector_math;

/// Detune is expressed in cents, 1200 of them per octave.
const CENTS_PER_OCTAVE: f32 = 1200.0;

/// The phase accumulator turns a base frequency plus a per-sample detune modulation into
/// the phase of every sample of a block, keeping the phase continuous from one block to
/// the next.
///
/// # Frequency modulation
/// Each sample's frequency is
///
/// `f[i] = ((mod[i] * detune / 1200)² + 1) * frequency`
///
/// The square folds both modulation polarities into a multiplier `>= 1`. It is not the
/// usual `2^(cents / 1200)` ratio, and it is kept as is so renders stay bit-compatible.
///
/// # Phase step
/// The per-sample step is the sample period plus half a sample period, scaled by the
/// sample's frequency, so the first sample of a fresh voice sits at
/// `1.5 * frequency / sample_rate`.
///
/// # Continuity
/// Only the fractional part of the last phase is carried into the next block. Inside a
/// block the running sum is kept unwrapped and wrapped into `[0, 1)` at the very end.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseAccumulator {
    /// Amount of samples in a second. Fixed for the lifetime of the accumulator.
    sample_rate: f32,
    /// Unwrapped phase of the last sample of the previous block.
    last_phase: f32,
    /// Scratch for the per-sample frequencies. Sized once, never reallocated.
    frequencies: Vec<f32>,
}

impl PhaseAccumulator {
    /// Creates an accumulator at phase zero able to process blocks of up to
    /// `max_block_size` samples. The sample rate must be positive; the
    /// [OscillatorBuilder](struct@crate::bundled_modules::OscillatorBuilder) checks it.
    pub fn new(sample_rate: f32, max_block_size: usize) -> Self {
        debug_assert!(sample_rate > 0.0, "Sample rate must be positive");

        Self {
            sample_rate,
            last_phase: 0.0,
            frequencies: vec![0.0; max_block_size],
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.frequencies.len()
    }

    /// Unwrapped phase reached at the end of the last processed block. Store it to freeze a
    /// voice and hand it back to [`restore`](fn@PhaseAccumulator::restore) to thaw it.
    pub fn last_phase(&self) -> f32 {
        self.last_phase
    }

    pub fn restore(&mut self, last_phase: f32) {
        self.last_phase = last_phase;
    }

    pub fn reset(&mut self) {
        self.last_phase = 0.0;
    }

    /// Writes the wrapped phase of every sample of the block into `phases`.
    ///
    /// # Arguments
    /// * `phases` - Output buffer. Its previous content is ignored.
    /// * `detune_mod` - Per-sample detune modulation, 0 meaning no modulation. Same length as `phases`.
    /// * `frequency` - Base frequency in Hz. Non-positive values are accepted and simply stall
    /// or reverse the phase.
    /// * `detune` - Detune amount in cents.
    ///
    /// Blocks longer than [`max_block_size`](fn@PhaseAccumulator::max_block_size) are a
    /// contract violation.
    pub fn compute_phases(
        &mut self,
        phases: &mut [f32],
        detune_mod: &[f32],
        frequency: f32,
        detune: f32,
    ) {
        let len = phases.len();
        debug_assert!(len <= self.frequencies.len(), "Block exceeds scratch size");
        debug_assert_eq!(len, detune_mod.len(), "Modulation length mismatch");

        // FREQUENCY OF EVERY SAMPLE
        let frequencies = &mut self.frequencies[..len];
        vector_math::scale(frequencies, detune_mod, detune / CENTS_PER_OCTAVE);
        vector_math::powi(frequencies, 2);
        vector_math::add_scalar(frequencies, 1.0);
        vector_math::mul_scalar(frequencies, frequency);

        // PHASE STEP OF EVERY SAMPLE
        let sample_period = 1.0 / self.sample_rate;
        vector_math::fill(phases, sample_period);
        vector_math::add_scalar(phases, sample_period / 2.0);
        vector_math::mul(phases, frequencies);

        // RUNNING SUM
        let mut phase = self.last_phase.rem_euclid(1.0);
        for step in phases.iter_mut() {
            phase += *step;
            *step = phase;
        }
        self.last_phase = phase;

        vector_math::fract(phases);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn render(accumulator: &mut PhaseAccumulator, len: usize, frequency: f32) -> Vec<f32> {
        let mut phases = vec![0.0; len];
        let modulation = vec![0.0; len];
        accumulator.compute_phases(&mut phases, &modulation, frequency, 0.0);
        phases
    }

    #[test]
    fn test_first_samples() {
        let mut accumulator = PhaseAccumulator::new(48000.0, 16);
        let phases = render(&mut accumulator, 4, 1000.0);

        let step = 1000.0 * (1.0 / 48000.0 + 1.0 / 96000.0);
        assert!((phases[0] - 0.03125).abs() < EPSILON, "First phase: {}", phases[0]);
        for (i, phase) in phases.iter().enumerate() {
            let expected = step * (i + 1) as f32;
            assert!(
                (phase - expected).abs() < EPSILON,
                "Phase {} mismatch: expected {}, actual {}",
                i,
                expected,
                phase
            );
        }
        assert!((accumulator.last_phase() - 0.125).abs() < EPSILON);
    }

    #[test]
    fn test_block_continuity() {
        let mut whole = PhaseAccumulator::new(44100.0, 256);
        let mut split = PhaseAccumulator::new(44100.0, 256);

        let expected = render(&mut whole, 256, 1234.5);
        let mut actual = render(&mut split, 100, 1234.5);
        actual.extend(render(&mut split, 156, 1234.5));

        for (i, (e, a)) in expected.iter().zip(actual.iter()).enumerate() {
            // a wrap may land on either side of 1.0 depending on rounding
            let diff = (e - a).abs();
            assert!(
                diff.min(1.0 - diff) < 1e-3,
                "Discontinuity at sample {}: {} vs {}",
                i,
                e,
                a
            );
        }
    }

    #[test]
    fn test_variable_block_sizes() {
        let mut accumulator = PhaseAccumulator::new(44100.0, 64);
        let mut reference = PhaseAccumulator::new(44100.0, 64);

        let mut actual = Vec::new();
        for len in [1, 7, 64, 0, 13, 3] {
            actual.extend(render(&mut accumulator, len, 440.0));
        }
        let expected = render(&mut reference, 64, 440.0)
            .into_iter()
            .chain(render(&mut reference, 24, 440.0))
            .collect::<Vec<f32>>();

        assert_eq!(actual.len(), expected.len());
        for (e, a) in expected.iter().zip(actual.iter()) {
            let diff = (e - a).abs();
            assert!(diff.min(1.0 - diff) < 1e-3);
        }
    }

    #[test]
    fn test_monotonic_phase() {
        let mut accumulator = PhaseAccumulator::new(44100.0, 512);
        let phases = render(&mut accumulator, 512, 880.0);

        let mut wraps = 0;
        for pair in phases.windows(2) {
            assert!(pair[0] >= 0.0 && pair[0] < 1.0, "Phase out of unit interval");
            if pair[1] < pair[0] {
                wraps += 1;
            }
        }

        // 512 samples * 1.5 * 880 / 44100 ≈ 15.3 cycles
        assert_eq!(wraps, 15, "Unexpected amount of wraps");
    }

    #[test]
    fn test_last_phase_is_unwrapped() {
        let mut accumulator = PhaseAccumulator::new(100.0, 8);
        render(&mut accumulator, 8, 10.0);

        // 8 * 0.15
        assert!((accumulator.last_phase() - 1.2).abs() < EPSILON);
    }

    #[test]
    fn test_restore_negative_phase() {
        let mut accumulator = PhaseAccumulator::new(100.0, 4);
        accumulator.restore(-0.25);
        let phases = render(&mut accumulator, 1, 1.0);

        // -0.25 mod 1 = 0.75, plus one step of 0.015
        assert!((phases[0] - 0.765).abs() < EPSILON);
    }

    #[test]
    fn test_reset() {
        let mut accumulator = PhaseAccumulator::new(44100.0, 16);
        let first = render(&mut accumulator, 16, 300.0);
        accumulator.reset();
        let second = render(&mut accumulator, 16, 300.0);

        assert_eq!(first, second);
    }

    #[test]
    fn test_squared_detune_ratio() {
        let mut accumulator = PhaseAccumulator::new(1000.0, 4);
        let mut phases = [0.0; 2];

        // (±1 * 1200 / 1200)² + 1 = 2 for both polarities
        accumulator.compute_phases(&mut phases, &[1.0, -1.0], 10.0, 1200.0);

        assert!((phases[0] - 0.03).abs() < EPSILON);
        assert!((phases[1] - 0.06).abs() < EPSILON);
    }

    #[test]
    fn test_zero_modulation_ignores_detune() {
        let mut detuned = PhaseAccumulator::new(44100.0, 32);
        let mut plain = PhaseAccumulator::new(44100.0, 32);
        let modulation = [0.0; 32];
        let mut a = [0.0; 32];
        let mut b = [0.0; 32];

        detuned.compute_phases(&mut a, &modulation, 440.0, 700.0);
        plain.compute_phases(&mut b, &modulation, 440.0, 0.0);

        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_frequency_stalls() {
        let mut accumulator = PhaseAccumulator::new(44100.0, 8);
        accumulator.restore(2.5);
        let phases = render(&mut accumulator, 8, 0.0);

        assert!(phases.iter().all(|p| *p == 0.5));
    }
}
