pub mod back_end;
pub mod bundled_modules;
pub mod dsp;
pub mod layout_yaml;
pub mod module;
pub mod patch;
pub mod real_time;
pub mod render;

/// Sample rate used when neither the oscillator nor the layout specify one.
pub const SAMPLE_RATE: i32 = 44100;
