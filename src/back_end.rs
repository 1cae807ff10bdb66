// Output device configuration and real-time playback of a patch.

use crate::patch::Patch;
use crate::real_time::BlockProducer;
use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    Device, FromSample, Sample, SampleFormat, SampleRate, StreamConfig, SupportedStreamConfig,
    SupportedStreamConfigRange,
};
use ringbuf::HeapRb;
use simplelog::{info, warn};
use std::thread::sleep;
use std::time::Duration;

/// Minimum capacity of the ring buffer between the patch and the device.
const BATCH_SIZE_RT: usize = 2048;

/// Looks up for a supported config with a specific sample format.
///
/// # Arguments
/// * `device` - a `Device` from which to get the **supported configurations**.
/// * `sample_format` - (optional) a `SampleFormat` with the **preferred format** for each **sample**.
/// * `sample_rate` - (optional) a `SampleRate`. If not set it will default to the max (not recommended).
/// * `channel_amt` - (optional) the maximum amount of channels to use. Mono or Stereo is recommended.
///
/// # Return
/// Returns the first `SupportedStreamConfig` fulfilling the requirements from the arguments.
pub fn get_preferred_config(
    device: &Device,
    sample_format: Option<SampleFormat>,
    sample_rate: Option<SampleRate>,
    channel_amt: Option<Channels>,
) -> anyhow::Result<SupportedStreamConfig> {
    let config = query_config(device, channel_amt, sample_format, sample_rate)?;

    info!("<b>Preferred config for <cyan>{}</>", device.name()?);
    info!(" |_ channels: {}", config.channels());
    info!(" |_ sample_rate: {}", config.sample_rate().0);
    info!(" |_ buffer size: {:?}", config.buffer_size());
    info!(" |_ sample format: {:?}", config.sample_format());

    Ok(config)
}

pub fn query_configurations(
    device: &Device,
    channel_amt: Option<Channels>,
    sample_format: Option<SampleFormat>,
) -> anyhow::Result<Vec<SupportedStreamConfigRange>> {
    let supported_configs = device
        .supported_output_configs()?
        // Check the sample format
        .filter(|config| match &sample_format {
            None => true,
            Some(a) => config.sample_format() == *a,
        })
        // Check the channel amount
        .filter(|config| match &channel_amt {
            None => true,
            Some(a) => a.get_amt() >= config.channels(),
        })
        .collect::<Vec<SupportedStreamConfigRange>>();

    Ok(supported_configs)
}

pub fn query_config(
    device: &Device,
    channel_amt: Option<Channels>,
    sample_format: Option<SampleFormat>,
    sample_rate: Option<SampleRate>,
) -> anyhow::Result<SupportedStreamConfig> {
    let supported_configs = query_configurations(device, channel_amt, sample_format)?;

    match sample_rate {
        None => supported_configs
            .into_iter()
            .last()
            .map(|range| range.with_max_sample_rate())
            .ok_or_else(|| anyhow!("No possible configuration could be found. Try widening the search.")),
        Some(rate) => supported_configs
            .into_iter()
            .rev()
            .find(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
            .map(|range| range.with_sample_rate(rate))
            .ok_or_else(|| anyhow!("The output device does not support {} Hz", rate.0)),
    }
}

/// An enumeration for specifying an amount of channels and easily differentiate the most common cases (mono and stereo).
#[derive(Debug, Clone, Copy)]
pub enum Channels {
    /// A single channel
    Mono,
    /// Two channels
    Stereo,
    /// Any given amount of channels
    Multi(u16),
}

impl Channels {
    /// Translates the `enum` to a value for ease.
    pub fn get_amt(&self) -> u16 {
        match *self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Multi(x) => x,
        }
    }
}

/// Writes the same sample on every channel of each frame.
pub fn write_data<T>(output: &mut [T], channels: usize, next_sample: &mut dyn FnMut() -> f32)
where
    T: Sample + FromSample<f32>,
{
    for frame in output.chunks_mut(channels) {
        let value: T = T::from_sample(next_sample());
        for sample in frame.iter_mut() {
            *sample = value;
        }
    }
}

/// Plays a patch on the default output device for `signal_duration` milliseconds.
///
/// The patch is rendered on the calling thread into a ring buffer which the device callback
/// drains. Errors reported by the stream stop the playback.
pub fn play(patch: Patch, signal_duration: u64) -> anyhow::Result<()> {
    let sample_rate = patch.sample_rate();
    let block_size = patch.block_size();

    let host = cpal::default_host();
    let device: Device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("No default output device available. Please check if one is selected"))?;

    let supported_config = get_preferred_config(
        &device,
        Some(SampleFormat::F32),
        Some(SampleRate(sample_rate as u32)),
        Some(Channels::Stereo),
    )?;
    let config: StreamConfig = supported_config.into();
    let channels = config.channels as usize;

    let ring_buffer: HeapRb<f32> = HeapRb::new(BATCH_SIZE_RT.max(4 * block_size));
    let (prod, mut cons) = ring_buffer.split();
    let mut producer = BlockProducer::new(patch, prod);
    let prefilled = producer.fill();

    let (err_tx, err_rx) = crossbeam::channel::unbounded();
    let mut next_value = move || cons.pop().unwrap_or(0.0); // Unwrap or silence

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            write_data(data, channels, &mut next_value)
        },
        move |err| {
            err_tx.send(err).ok();
        },
        None,
    )?;

    info!("<b>Signal duration: <u>{} milliseconds</>", signal_duration);
    stream.play()?;

    let total = (signal_duration as f32 * sample_rate / 1000.0) as usize;
    feed(&mut producer, prefilled, total, || match err_rx.try_recv() {
        Ok(err) => Err(anyhow!("An error occurred on stream: {}", err)),
        Err(_) => Ok(()),
    })?;

    // let the device drain what is left
    sleep(Duration::from_millis(
        (BATCH_SIZE_RT.max(4 * block_size) as f32 * 1000.0 / sample_rate) as u64,
    ));
    warn!("<yellow><warn></> <b>The end of the signal may be filled with <blue>silence</><b>.</>");

    Ok(())
}

/// Pushes blocks until `total` samples went through the producer, `produced` of them already.
/// `poll` runs before every push and stops the feed on error. Returns the amount of samples
/// pushed, rounded up to whole blocks.
fn feed<F>(
    producer: &mut BlockProducer,
    mut produced: usize,
    total: usize,
    mut poll: F,
) -> anyhow::Result<usize>
where
    F: FnMut() -> anyhow::Result<()>,
{
    while produced < total {
        poll()?;

        match producer.push_block() {
            Ok(count) => produced += count,
            Err(_) => sleep(Duration::from_millis(5)),
        }
    }

    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundled_modules::OscillatorBuilder;
    use crate::patch::PatchCell;

    fn get_producer(capacity: usize) -> (BlockProducer, ringbuf::HeapConsumer<f32>) {
        let osc = OscillatorBuilder::new().build().unwrap();
        let patch =
            Patch::new(vec![PatchCell::new(0, Box::new(osc), None)], 0, 44100.0, 16).unwrap();
        let (prod, cons) = HeapRb::<f32>::new(capacity).split();

        (BlockProducer::new(patch, prod), cons)
    }

    #[test]
    fn test_write_data_copies_to_every_channel() {
        let mut samples = [0.25, -0.5, 1.0].into_iter();
        let mut next_sample = move || samples.next().unwrap_or(0.0);
        let mut output = [9.0_f32; 5];

        write_data(&mut output, 2, &mut next_sample);

        // the last frame is incomplete and only gets its first channel
        assert_eq!(output, [0.25, 0.25, -0.5, -0.5, 1.0]);
    }

    #[test]
    fn test_write_data_converts_samples() {
        let mut next_sample = || 0.5;
        let mut output = [0_i16; 4];

        write_data(&mut output, 2, &mut next_sample);

        assert_eq!(output, [16384; 4]);
    }

    #[test]
    fn test_feed_counts_prefilled_samples() {
        let (mut producer, mut cons) = get_producer(64);
        let mut received = Vec::new();

        let prefilled = producer.fill();
        assert_eq!(prefilled, 64);

        let produced = feed(&mut producer, prefilled, 160, || {
            received.extend(cons.pop_iter());
            Ok(())
        })
        .unwrap();
        received.extend(cons.pop_iter());

        assert_eq!(produced, 160);
        assert_eq!(received.len(), 160, "Samples pushed past the duration");
    }

    #[test]
    fn test_feed_stops_on_error() {
        let (mut producer, _cons) = get_producer(64);

        let result = feed(&mut producer, 0, 1024, || Err(anyhow!("stream closed")));

        assert!(result.is_err());
    }
}
