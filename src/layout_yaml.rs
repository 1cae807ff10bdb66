use crate::bundled_modules::{Oscillator, OscillatorBuilder, OscillatorError};
use crate::module::Module;
use crate::patch::{Patch, PatchCell, PatchError};
use crate::SAMPLE_RATE;
use simplelog::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use yaml_rust::{Yaml, YamlLoader};

const YAML_VERSION: f64 = 1.0;
/// Block size of a patch when the layout does not set one.
pub const DEFAULT_BLOCK_SIZE: usize = 256;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LayoutError {
    #[error("Could not read the layout file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid YAML: {0}")]
    Scan(#[from] yaml_rust::ScanError),
    #[error("The layout file is empty")]
    Empty,
    #[error("Unsupported layout version {found}, please use version {expected}")]
    Version { found: f64, expected: f64 },
    #[error("Invalid value for the layout setting '{0}'")]
    InvalidSetting(&'static str),
    #[error("A module is missing its '{0}' field")]
    MissingField(&'static str),
    #[error("Module {id}: invalid value for '{field}'")]
    InvalidField { id: i64, field: &'static str },
    #[error("Module {id}: unknown module type '{kind}'")]
    UnknownType { id: i64, kind: String },
    #[error("Modules {first} and {second} are both linked to the OS output")]
    DuplicatedOutput { first: i64, second: i64 },
    #[error("No module linked to the OS output. Add 'os-out: true' to one module")]
    NoOutput,
    #[error("Module {id}: {source}")]
    Oscillator { id: i64, source: OscillatorError },
    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Reads a layout file and builds the [Patch] it describes.
///
/// # Format
/// ```yaml
/// version: 1.0
/// sample-rate: 44100     # optional, defaults to SAMPLE_RATE
/// block-size: 256        # optional
/// layout:
///   - module:
///       id: 1
///       type: oscillator
///       config:
///         name: vibrato
///         frequency: 5
///   - module:
///       id: 0
///       type: oscillator
///       os-out: true       # the module heard on the output
///       modulated-by: 1    # output of module 1 drives the detune modulation
///       config:
///         frequency: 220
///         detune: 30
///         phase-offset: 0
///         pulse-width: 0.5
///         waveform: triangle
///         max-block-size: 256
/// ```
pub fn load_layout<P: AsRef<Path>>(path: P) -> Result<Patch, LayoutError> {
    let path = path.as_ref();
    info!("<b>Loading data from <red>{}</><b>.</>", path.display());

    let yaml = fs::read_to_string(path).map_err(|source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_layout(&yaml)
}

/// Builds a [Patch] from the content of a layout file. See [load_layout] for the format.
pub fn parse_layout(source: &str) -> Result<Patch, LayoutError> {
    let docs = YamlLoader::load_from_str(source)?;
    let doc = docs.first().ok_or(LayoutError::Empty)?;

    let version = as_number(&doc["version"]).unwrap_or(0.0);
    if version != YAML_VERSION {
        error!("<b>Please use the <red>latest YAML</> <b>version.</>");
        return Err(LayoutError::Version {
            found: version,
            expected: YAML_VERSION,
        });
    }
    info!(
        "<b>Using <magenta>YAML parsing</> <b>version: <b><cyan>{}</>",
        version
    );

    let sample_rate = match &doc["sample-rate"] {
        Yaml::BadValue => SAMPLE_RATE as f32,
        value => as_number(value).ok_or(LayoutError::InvalidSetting("sample-rate"))? as f32,
    };

    let block_size = match &doc["block-size"] {
        Yaml::BadValue => DEFAULT_BLOCK_SIZE,
        value => value
            .as_i64()
            .filter(|size| *size > 0)
            .ok_or(LayoutError::InvalidSetting("block-size"))? as usize,
    };

    let layout = doc["layout"]
        .as_vec()
        .ok_or(LayoutError::MissingField("layout"))?;

    info!("<b>Creating patch.</>");
    let mut cells: Vec<PatchCell> = Vec::with_capacity(layout.len());
    let mut output: Option<i64> = None;

    for entry in layout {
        let module = &entry["module"];

        let id = module["id"].as_i64().ok_or_else(|| {
            error!("<b>Missing module <red>ID</><b>.</>");
            LayoutError::MissingField("id")
        })?;
        info!("> Processing <cyan>module {}</>", id);

        if module["os-out"].as_bool().unwrap_or(false) {
            if let Some(first) = output {
                error!("<b>Two modules have been defined as <red>Operative System output</><b>. There can only be <cyan>one at a time</><b>.</>");
                return Err(LayoutError::DuplicatedOutput { first, second: id });
            }
            output = Some(id);
        }

        let kind = module["type"]
            .as_str()
            .ok_or(LayoutError::MissingField("type"))?;

        let generated_module: Box<dyn Module> = match kind {
            "oscillator" => Box::new(build_oscillator(
                id,
                &module["config"],
                sample_rate,
                block_size,
            )?),
            _ => {
                error!("<b>Module type <red>not found</><b>. ID: {}.</>", id);
                return Err(LayoutError::UnknownType {
                    id,
                    kind: kind.to_string(),
                });
            }
        };
        info!("  |_ type: {}", kind);

        let modulated_by = match &module["modulated-by"] {
            Yaml::BadValue => None,
            Yaml::Integer(from) => {
                info!("  |_ modulated by module #{}", from);
                Some(*from)
            }
            _ => {
                warn!("<b>Invalid format for <yellow>modulated-by</> <b>value.</>");
                return Err(LayoutError::InvalidField {
                    id,
                    field: "modulated-by",
                });
            }
        };

        cells.push(PatchCell::new(id, generated_module, modulated_by));
    }

    let output = output.ok_or_else(|| {
        error!("<b>No module linked to <red>Operating System</><b>. Add field 'os-out: true' to the module to be heard.</>");
        LayoutError::NoOutput
    })?;
    info!("Output module: {}", output);

    let patch = Patch::new(cells, output, sample_rate, block_size)?;
    patch.display_order();

    Ok(patch)
}

fn build_oscillator(
    id: i64,
    config: &Yaml,
    sample_rate: f32,
    block_size: usize,
) -> Result<Oscillator, LayoutError> {
    let mut builder = OscillatorBuilder::new()
        .with_sample_rate(sample_rate)
        .with_max_block_size(block_size);

    if config.is_badvalue() || config.is_null() {
        info!("No configuration found for oscillator");
    }

    if let Some(name) = config["name"].as_str() {
        info!("  |_ name: {}", name);
        builder = builder.with_name(name);
    }
    if let Some(frequency) = optional_number(config, "frequency", id)? {
        builder = builder.with_frequency(frequency);
    }
    if let Some(detune) = optional_number(config, "detune", id)? {
        builder = builder.with_detune(detune);
    }
    if let Some(offset) = optional_number(config, "phase-offset", id)? {
        builder = builder.with_phase_offset(offset);
    }
    if let Some(width) = optional_number(config, "pulse-width", id)? {
        builder = builder.with_pulse_width(width);
    }

    match &config["waveform"] {
        Yaml::BadValue => {}
        Yaml::String(waveform) => builder = builder.with_waveform_name(waveform),
        _ => {
            return Err(LayoutError::InvalidField {
                id,
                field: "waveform",
            })
        }
    }

    match &config["max-block-size"] {
        Yaml::BadValue => {}
        Yaml::Integer(size) if *size > 0 => builder = builder.with_max_block_size(*size as usize),
        _ => {
            return Err(LayoutError::InvalidField {
                id,
                field: "max-block-size",
            })
        }
    }

    builder
        .build()
        .map_err(|source| LayoutError::Oscillator { id, source })
}

fn as_number(yaml: &Yaml) -> Option<f64> {
    match yaml {
        Yaml::Real(_) => yaml.as_f64(),
        Yaml::Integer(value) => Some(*value as f64),
        _ => None,
    }
}

/// Missing keys are `None`; keys holding anything but a number are an error.
fn optional_number(
    config: &Yaml,
    field: &'static str,
    id: i64,
) -> Result<Option<f32>, LayoutError> {
    match &config[field] {
        Yaml::BadValue => Ok(None),
        value => as_number(value)
            .map(|x| Some(x as f32))
            .ok_or(LayoutError::InvalidField { id, field }),
    }
}
