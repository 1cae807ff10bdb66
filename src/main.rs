use clap::Parser;
use std::path::PathBuf;

// DEBUGGING, LOGGING
use simplelog::__private::paris::Logger;
use simplelog::*;

// MY STUFF
use lion_osc::back_end::play;
use lion_osc::layout_yaml::load_layout;
use lion_osc::render::render_wav;

const DEFAULT_LAYOUT: &str = "layouts/vibrato.yaml";
const SIGNAL_DURATION: u64 = 2000; // milliseconds

/// Plays an oscillator layout on the default output device, or renders it to a WAV file.
#[derive(Parser, Debug)]
#[command(name = "lion_osc")]
#[command(version)]
struct Cli {
    /// YAML layout to load
    #[arg(default_value = DEFAULT_LAYOUT)]
    layout: PathBuf,

    /// Render into this WAV file instead of playing
    #[arg(long, value_name = "PATH")]
    wav: Option<PathBuf>,

    /// Length of the signal in milliseconds
    #[arg(long, value_name = "MS", default_value_t = SIGNAL_DURATION)]
    duration: u64,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // LOGGER INIT
    TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;
    let mut logger = Logger::new();

    info!("<b>Running <blue>{}</>", cli.layout.display());
    let mut patch = load_layout(&cli.layout)?;

    match cli.wav {
        Some(path) => {
            logger.loading("<blue><info></><b> Rendering</>");
            let written = render_wav(&mut patch, &path, cli.duration)?;
            logger.done();
            info!("<b>{} samples written to <cyan>{}</>", written, path.display());
        }
        None => {
            logger.loading("<blue><info></><b> Playing sound</>");
            play(patch, cli.duration)?;
            logger.done();
        }
    }

    info!("<green><tick></> <b>Program finished <green>successfully</>");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["lion_osc"]).unwrap();

        assert_eq!(cli.layout, PathBuf::from(DEFAULT_LAYOUT));
        assert_eq!(cli.wav, None);
        assert_eq!(cli.duration, SIGNAL_DURATION);
    }

    #[test]
    fn test_render_arguments() {
        let cli = Cli::try_parse_from([
            "lion_osc",
            "layouts/pulse.yaml",
            "--duration",
            "50",
            "--wav",
            "x.wav",
        ])
        .unwrap();

        assert_eq!(cli.layout, PathBuf::from("layouts/pulse.yaml"));
        assert_eq!(cli.wav, Some(PathBuf::from("x.wav")));
        assert_eq!(cli.duration, 50);
    }

    #[test]
    fn test_misspelled_flag_is_rejected() {
        let result = Cli::try_parse_from(["lion_osc", "layouts/pulse.yaml", "--durtion", "50"]);
        assert!(result.is_err(), "A typo must not be taken as the layout");
    }

    #[test]
    fn test_help_does_not_load_a_layout() {
        let error = Cli::try_parse_from(["lion_osc", "--help"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
