use crate::patch::Patch;
use hound::{SampleFormat, WavSpec, WavWriter};
use simplelog::info;
use std::path::Path;

/// Renders `buffer_length` samples of the patch.
pub fn render_buffer(patch: &mut Patch, buffer_length: usize) -> Vec<f32> {
    let mut buffer = vec![0.0; buffer_length];
    patch.render(&mut buffer);
    buffer
}

/// Renders `signal_duration` milliseconds of the patch into a mono, 32-bit float WAV file.
/// Returns the amount of samples written.
pub fn render_wav<P: AsRef<Path>>(
    patch: &mut Patch,
    path: P,
    signal_duration: u64,
) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let spec = WavSpec {
        channels: 1,
        sample_rate: patch.sample_rate() as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let total = (signal_duration as f32 * patch.sample_rate() / 1000.0) as usize;
    info!(
        "<b>Rendering <u>{} milliseconds</> <b>({} samples) into <cyan>{}</>",
        signal_duration,
        total,
        path.display()
    );

    let mut writer = WavWriter::create(path, spec)?;
    let mut block = vec![0.0; patch.block_size()];
    let mut written = 0;

    while written < total {
        let len = block.len().min(total - written);
        patch.render(&mut block[..len]);
        for sample in &block[..len] {
            writer.write_sample(*sample)?;
        }
        written += len;
    }

    writer.finalize()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_yaml::parse_layout;
    use std::env;

    const LAYOUT: &str = "
version: 1.0
sample-rate: 8000
block-size: 64
layout:
  - module:
      id: 0
      type: oscillator
      os-out: true
      config:
        frequency: 250
        waveform: sawtooth
";

    #[test]
    fn test_render_buffer() {
        let mut patch = parse_layout(LAYOUT).unwrap();
        let buffer = render_buffer(&mut patch, 100);

        assert_eq!(buffer.len(), 100);
        assert!(buffer.iter().all(|x| (-1.0..=1.0).contains(x)));
    }

    #[test]
    fn test_render_wav() {
        let mut patch = parse_layout(LAYOUT).unwrap();
        let mut reference = parse_layout(LAYOUT).unwrap();
        let path = env::temp_dir().join(format!("lion_osc_render_{}.wav", std::process::id()));

        // 8000 Hz * 0.1 s
        let written = render_wav(&mut patch, &path, 100).unwrap();
        assert_eq!(written, 800);

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();

        assert_eq!(samples, render_buffer(&mut reference, 800));
        std::fs::remove_file(&path).ok();
    }
}
