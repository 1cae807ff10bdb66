use crate::bundled_modules::osc::{
    warp_in_place, OscillatorError, PhaseAccumulator, PulseWidth, Waveform,
};
use crate::module::{Module, Parameter, ParameterBuilder, ParameterError};
use crate::SAMPLE_RATE;
#[cfg(feature = "verbose_modules")]
use simplelog::info;

/// Scratch size used when the builder is not told otherwise.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 512;

/// The oscillator is the genesis of the chain. It generates a phase-continuous periodic
/// signal, one block at a time, following the parameters below.
///
/// # Usage
/// To generate a **new oscillator**, use the [OscillatorBuilder] instead.
///
/// To **change the behaviour** of an instance, use the functions named after the parameters
/// (right below).
///
/// # Parameters
/// * **Frequency**: base frequency in Hz. Non-positive values are accepted and stall or
/// reverse the phase.
/// * **Detune**: in cents. Scaled by the modulation input of each sample, see
/// [PhaseAccumulator].
/// * **Phase offset**: reserved, stored but not applied.
/// * **Pulse width**: duty cycle in `[0, 1]`. At 0.5 the phase is left untouched, otherwise
/// it is warped before shaping.
/// * **Waveform**: the shape of the output, see [Waveform].
///
/// # Behaviour
/// Every block goes through the same pipeline, in place over the output buffer:
/// 1. The [PhaseAccumulator] writes the wrapped phase of every sample.
/// 2. The phases are warped around the pulse width, unless it is 0.5.
/// 3. The [Waveform] turns the phases into amplitudes.
///
/// Nothing on this path allocates. Blocks longer than the scratch given to the builder are
/// processed in several chunks with identical results.
pub struct Oscillator {
    /// Phase bookkeeping, carried from block to block.
    phase: PhaseAccumulator,
    waveform: Waveform,
    frequency: Parameter,
    detune: Parameter,
    phase_offset: Parameter,
    pulse_width: Parameter,
    /// Name of the module (debugging)
    name: String,
}

impl Module for Oscillator {
    fn process(&mut self, buffer: &mut [f32], modulation: &[f32]) {
        let chunk_size = self.phase.max_block_size();
        let width = self.pulse_width.get_value();

        for (out, modulation) in buffer
            .chunks_mut(chunk_size)
            .zip(modulation.chunks(chunk_size))
        {
            self.process_block(out, modulation, PulseWidth::Constant(width));
        }
    }

    fn get_parameters(&self) -> Vec<&Parameter> {
        vec![
            &self.frequency,
            &self.detune,
            &self.phase_offset,
            &self.pulse_width,
        ]
    }

    fn get_parameters_mutable(&mut self) -> Vec<&mut Parameter> {
        vec![
            &mut self.frequency,
            &mut self.detune,
            &mut self.phase_offset,
            &mut self.pulse_width,
        ]
    }

    fn get_sample_rate(&self) -> f32 {
        self.phase.sample_rate()
    }

    fn get_name(&self) -> String {
        self.name.to_string()
    }
}

impl Oscillator {
    /// Same as [process](fn@Module::process) but with a duty cycle for every sample instead of
    /// the pulse width parameter. `widths` has the same length as `buffer`.
    pub fn process_with_pulse_width(
        &mut self,
        buffer: &mut [f32],
        modulation: &[f32],
        widths: &[f32],
    ) {
        let chunk_size = self.phase.max_block_size();

        for ((out, modulation), widths) in buffer
            .chunks_mut(chunk_size)
            .zip(modulation.chunks(chunk_size))
            .zip(widths.chunks(chunk_size))
        {
            self.process_block(out, modulation, PulseWidth::PerSample(widths));
        }
    }

    fn process_block(&mut self, out: &mut [f32], modulation: &[f32], width: PulseWidth) {
        self.phase.compute_phases(
            out,
            modulation,
            self.frequency.get_value(),
            self.detune.get_value(),
        );

        if !width.is_identity() {
            warp_in_place(out, width);
        }

        self.waveform.shape_in_place(out);

        #[cfg(feature = "verbose_modules")]
        info!(
            "<b>{}</>: {} samples, last phase <cyan>{}</>",
            self.name,
            out.len(),
            self.phase.last_phase()
        );
    }

    /// Unwrapped phase at the end of the last block. Feed it to
    /// [`restore_phase`](fn@Oscillator::restore_phase) to resume the voice later on.
    pub fn last_phase(&self) -> f32 {
        self.phase.last_phase()
    }

    pub fn restore_phase(&mut self, last_phase: f32) {
        self.phase.restore(last_phase);
    }

    /// Starts the next block from phase zero.
    pub fn reset(&mut self) {
        self.phase.reset();
    }

    pub fn max_block_size(&self) -> usize {
        self.phase.max_block_size()
    }
}

/// Some shortcut methods for the parameters.
impl Oscillator {
    pub fn set_frequency(&mut self, freq: f32) -> Result<(), ParameterError> {
        self.frequency.set(freq)
    }

    pub fn set_detune(&mut self, cents: f32) -> Result<(), ParameterError> {
        self.detune.set(cents)
    }

    pub fn set_phase_offset(&mut self, offset: f32) -> Result<(), ParameterError> {
        self.phase_offset.set(offset)
    }

    pub fn set_pulse_width(&mut self, width: f32) -> Result<(), ParameterError> {
        self.pulse_width.set(width)
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn get_frequency(&self) -> f32 {
        self.frequency.get_value()
    }

    pub fn get_detune(&self) -> f32 {
        self.detune.get_value()
    }

    pub fn get_phase_offset(&self) -> f32 {
        self.phase_offset.get_value()
    }

    pub fn get_pulse_width(&self) -> f32 {
        self.pulse_width.get_value()
    }

    pub fn get_waveform(&self) -> Waveform {
        self.waveform
    }
}

/// The [OscillatorBuilder] is the proper way of generating an [Oscillator].
/// # Usage
/// ```rust
/// let mut oscillator = OscillatorBuilder::new().build().unwrap(); // Default oscillator
///
/// let osc = OscillatorBuilder::new()
///     .with_sample_rate(48000.0)
///     .with_frequency(220.0)
///     .with_detune(25.0)
///     .with_pulse_width(0.3)
///     .with_waveform_name("inverse sawtooth")
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct OscillatorBuilder {
    sample_rate: Option<f32>,
    frequency: Option<f32>,
    detune: Option<f32>,
    phase_offset: Option<f32>,
    pulse_width: Option<f32>,
    waveform: Option<Waveform>,
    waveform_name: Option<String>,
    max_block_size: Option<usize>,
    name: Option<String>,
}

impl OscillatorBuilder {
    /// Sets the defaults for the oscillator (no parameters).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sample rate of the oscillator. It can not be changed afterwards.
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// Sets the **default** value of the *frequency [parameter](struct@Parameter)*.
    pub fn with_frequency(mut self, freq: f32) -> Self {
        self.frequency = Some(freq);
        self
    }

    /// Sets the **default** value of the *detune [parameter](struct@Parameter)*, in cents.
    pub fn with_detune(mut self, cents: f32) -> Self {
        self.detune = Some(cents);
        self
    }

    /// Sets the **default** value of the *phase offset [parameter](struct@Parameter)*.
    pub fn with_phase_offset(mut self, offset: f32) -> Self {
        self.phase_offset = Some(offset);
        self
    }

    /// Sets the **default** value of the *pulse width [parameter](struct@Parameter)*.
    pub fn with_pulse_width(mut self, width: f32) -> Self {
        self.pulse_width = Some(width);
        self
    }

    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = Some(waveform);
        self
    }

    /// Selects the waveform by name ("sine", "square", "sawtooth", "inverse sawtooth",
    /// "triangle" or "pulse"). Checked on [build](fn@OscillatorBuilder::build) and preferred
    /// over [with_waveform](fn@OscillatorBuilder::with_waveform).
    pub fn with_waveform_name(mut self, name: &str) -> Self {
        self.waveform_name = Some(name.to_string());
        self
    }

    /// Largest block processed in one go. Longer blocks are split.
    pub fn with_max_block_size(mut self, size: usize) -> Self {
        self.max_block_size = Some(size);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Tries to generate an Oscillator from the given configuration.
    ///
    /// # Default values:
    /// * Sample rate: [SAMPLE_RATE](const@SAMPLE_RATE)
    /// * Frequency: 440 Hz
    /// * Detune: 0 cents
    /// * Phase offset: 0
    /// * Pulse width: 0.5
    /// * Waveform: sine
    /// * Max block size: [DEFAULT_MAX_BLOCK_SIZE]
    ///
    /// # Expected errors
    /// * Non-positive (or non-finite) sample rate.
    /// * Unknown waveform name.
    /// * Zero max block size.
    /// * Frequency, detune, phase offset or pulse width out of range.
    pub fn build(self) -> Result<Oscillator, OscillatorError> {
        let name = match self.name {
            Some(name) => format!("{} Oscillator", name),
            None => "Oscillator".to_string(),
        };

        let sample_rate = self.sample_rate.unwrap_or(SAMPLE_RATE as f32);
        if !(sample_rate > 0.0 && sample_rate.is_finite()) {
            return Err(OscillatorError::InvalidSampleRate(sample_rate));
        }

        let max_block_size = self.max_block_size.unwrap_or(DEFAULT_MAX_BLOCK_SIZE);
        if max_block_size == 0 {
            return Err(OscillatorError::InvalidBlockSize);
        }

        let waveform = match self.waveform_name {
            Some(waveform_name) => waveform_name.parse()?,
            None => self.waveform.unwrap_or_default(),
        };

        Ok(Oscillator {
            name,
            phase: PhaseAccumulator::new(sample_rate, max_block_size),
            waveform,
            frequency: ParameterBuilder::new("frequency".to_string())
                .with_max(22000.0)
                .with_min(-22000.0)
                .with_step(1.0)
                .with_default(self.frequency.unwrap_or(440.0))
                .build()?,
            detune: ParameterBuilder::new("detune".to_string())
                .with_max(4800.0)
                .with_min(-4800.0)
                .with_step(1.0)
                .with_default(self.detune.unwrap_or(0.0))
                .build()?,
            phase_offset: ParameterBuilder::new("phase_offset".to_string())
                .with_max(1.0)
                .with_step(0.01)
                .with_default(self.phase_offset.unwrap_or(0.0))
                .build()?,
            pulse_width: ParameterBuilder::new("pulse_width".to_string())
                .with_max(1.0)
                .with_step(0.01)
                .with_default(self.pulse_width.unwrap_or(PulseWidth::CENTERED))
                .build()?,
        })
    }
}


#[cfg(test)]
mod oscillator_tests {
    use super::*;
    use crate::bundled_modules::osc::warp;

    fn render(osc: &mut Oscillator, len: usize) -> Vec<f32> {
        let mut buffer = vec![0.0; len];
        osc.process(&mut buffer, &vec![0.0; len]);
        buffer
    }

    #[test]
    fn test_pipeline() {
        let mut osc = OscillatorBuilder::new()
            .with_sample_rate(48000.0)
            .with_frequency(1000.0)
            .with_waveform(Waveform::InverseSawtooth)
            .build()
            .unwrap();

        let output = render(&mut osc, 4);

        // phase 0.03125 * (i + 1) mapped through 2p - 1
        for (i, sample) in output.iter().enumerate() {
            let expected = 2.0 * 0.03125 * (i + 1) as f32 - 1.0;
            assert!((sample - expected).abs() < 1e-5, "Sample {} mismatch", i);
        }
    }

    #[test]
    fn test_matches_manual_pipeline() {
        let mut osc = OscillatorBuilder::new()
            .with_frequency(330.0)
            .with_detune(100.0)
            .with_pulse_width(0.2)
            .with_waveform(Waveform::Triangle)
            .build()
            .unwrap();
        let mut accumulator = PhaseAccumulator::new(44100.0, 128);

        let modulation: Vec<f32> = (0..128).map(|i| (i as f32 / 20.0).sin()).collect();
        let mut actual = vec![0.0; 128];
        osc.process(&mut actual, &modulation);

        let mut phases = vec![0.0; 128];
        accumulator.compute_phases(&mut phases, &modulation, 330.0, 100.0);
        let mut warped = vec![0.0; 128];
        warp(&mut warped, &phases, PulseWidth::Constant(0.2));
        let mut expected = vec![0.0; 128];
        Waveform::Triangle.shape(&mut expected, &warped);

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_block_continuity() {
        let mut whole = OscillatorBuilder::new().build().unwrap();
        let mut split = OscillatorBuilder::new().build().unwrap();

        let expected = render(&mut whole, 300);
        let mut actual = render(&mut split, 120);
        actual.extend(render(&mut split, 180));

        for (i, (e, a)) in expected.iter().zip(actual.iter()).enumerate() {
            assert!((e - a).abs() < 1e-3, "Click at sample {}: {} vs {}", i, e, a);
        }
    }

    #[test]
    fn test_long_blocks_are_chunked() {
        let mut chunked = OscillatorBuilder::new()
            .with_max_block_size(32)
            .with_waveform(Waveform::Sawtooth)
            .build()
            .unwrap();
        let mut by_hand = OscillatorBuilder::new()
            .with_max_block_size(32)
            .with_waveform(Waveform::Sawtooth)
            .build()
            .unwrap();

        let actual = render(&mut chunked, 100);
        let mut expected = Vec::new();
        for len in [32, 32, 32, 4] {
            expected.extend(render(&mut by_hand, len));
        }

        assert_eq!(actual, expected);
        assert_eq!(chunked.last_phase(), by_hand.last_phase());
    }

    #[test]
    fn test_per_sample_width_matches_parameter() {
        let mut constant = OscillatorBuilder::new()
            .with_pulse_width(0.35)
            .with_waveform(Waveform::Square)
            .build()
            .unwrap();
        let mut modulated = OscillatorBuilder::new()
            .with_waveform(Waveform::Square)
            .build()
            .unwrap();

        let expected = render(&mut constant, 256);
        let mut actual = vec![0.0; 256];
        modulated.process_with_pulse_width(&mut actual, &[0.0; 256], &[0.35; 256]);

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_freeze_and_thaw() {
        let mut osc = OscillatorBuilder::new().build().unwrap();
        render(&mut osc, 77);
        let frozen = osc.last_phase();
        let expected = render(&mut osc, 64);

        let mut thawed = OscillatorBuilder::new().build().unwrap();
        thawed.restore_phase(frozen);
        assert_eq!(render(&mut thawed, 64), expected);
    }

    #[test]
    fn test_reset() {
        let mut osc = OscillatorBuilder::new().build().unwrap();
        let first = render(&mut osc, 50);
        osc.reset();
        assert_eq!(render(&mut osc, 50), first);
    }

    #[test]
    fn test_square_output() {
        let mut osc = OscillatorBuilder::new()
            .with_waveform(Waveform::Square)
            .with_frequency(1000.0)
            .build()
            .unwrap();

        let output = render(&mut osc, 441);
        assert!(output.iter().all(|x| [-1.0, 0.0, 1.0].contains(x)));
        assert!(output.contains(&1.0) && output.contains(&-1.0));
    }

    #[test]
    fn test_setters() {
        let mut osc = OscillatorBuilder::new().build().unwrap();

        osc.set_frequency(220.0).unwrap();
        osc.set_detune(1200.0).unwrap();
        osc.set_phase_offset(0.5).unwrap();
        osc.set_pulse_width(0.1).unwrap();
        osc.set_waveform(Waveform::Pulse);

        assert_eq!(osc.get_frequency(), 220.0);
        assert_eq!(osc.get_detune(), 1200.0);
        assert_eq!(osc.get_phase_offset(), 0.5);
        assert_eq!(osc.get_pulse_width(), 0.1);
        assert_eq!(osc.get_waveform(), Waveform::Pulse);

        assert!(osc.set_pulse_width(2.0).is_err());
        assert_eq!(osc.get_pulse_width(), 0.1, "Rejected value must not stick");
    }

    #[test]
    fn test_update_parameters() {
        let mut osc = OscillatorBuilder::new().build().unwrap();
        let mut values = osc.get_current_parameter_values();
        values.insert("frequency".to_string(), 110.0);
        values.insert("unknown".to_string(), 1.0);

        osc.update_parameters(values);

        assert_eq!(osc.get_frequency(), 110.0);
        assert_eq!(osc.get_pulse_width(), 0.5);
    }

    #[test]
    fn test_fill_buffer() {
        let mut osc = OscillatorBuilder::new().with_frequency(100.0).build().unwrap();
        let mut reference = OscillatorBuilder::new().with_frequency(100.0).build().unwrap();

        let mut buffer = vec![0.0; 1000];
        osc.fill_buffer(&mut buffer, 256);

        let mut expected = Vec::new();
        for len in [256, 256, 256, 232] {
            expected.extend(render(&mut reference, len));
        }
        assert_eq!(buffer, expected);
    }
}
