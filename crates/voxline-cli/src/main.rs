//! CLI entry point - the composition root.
//!
//! This is the only place where the environment is read, logging is
//! initialized, and errors are mapped to exit codes. Everything else
//! lives in `voxline-synth` / `voxline-core`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use voxline_core::{AudioFormat, SynthConfig, SynthesisError, VoiceOptions, options};
use voxline_synth::SpeechSynthesizer;

/// Synthesize speech from text over the streaming inference endpoint.
///
/// The bearer credential is read from `DASHSCOPE_API_KEY` (a `.env` file
/// next to the working directory is honored).
#[derive(Parser)]
#[command(name = "voxline")]
#[command(about = "Stream text-to-speech synthesis to an audio file")]
#[command(version)]
struct Cli {
    /// Text to synthesize
    text: String,

    /// Output audio file (created or truncated)
    #[arg(short = 'o', long = "output", default_value = "output.mp3")]
    output: PathBuf,

    /// Synthesis model identifier
    #[arg(long, default_value = options::DEFAULT_MODEL)]
    model: String,

    /// Timbre selector
    #[arg(long, default_value = options::DEFAULT_VOICE)]
    voice: String,

    /// Output codec: mp3, wav, or pcm
    #[arg(long, default_value_t = AudioFormat::Mp3)]
    format: AudioFormat,

    /// Output sample rate in Hz
    #[arg(long = "sample-rate", default_value_t = options::DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Volume, 0-100
    #[arg(long, default_value_t = options::DEFAULT_VOLUME, value_parser = clap::value_parser!(u8).range(..=100))]
    volume: u8,

    /// Speech-speed multiplier
    #[arg(long, default_value_t = 1.0)]
    rate: f32,

    /// Pitch multiplier
    #[arg(long, default_value_t = 1.0)]
    pitch: f32,

    /// Override the inference endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Overall session deadline in seconds
    #[arg(long = "timeout")]
    timeout_secs: Option<u64>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    // Load environment variables before anything reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<(), SynthesisError> {
    let mut config = SynthConfig::from_env()?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(secs) = cli.timeout_secs {
        config.timing.session_deadline = Duration::from_secs(secs);
    }

    let voice_options = VoiceOptions {
        model: cli.model,
        voice: cli.voice,
        format: cli.format,
        sample_rate: cli.sample_rate,
        volume: cli.volume,
        rate: cli.rate,
        pitch: cli.pitch,
    };
    debug!(?voice_options, "resolved options");

    let synthesizer = SpeechSynthesizer::new(config);
    synthesizer
        .synthesize(&cli.text, &cli.output, &voice_options)
        .await?;

    println!("Wrote {}", cli.output.display());
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "voxline=debug" } else { "voxline=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Map errors to exit codes.
///
/// Exit codes follow Unix conventions (sysexits.h) where a category
/// fits; a server-side task failure is a plain general error.
fn exit_code(err: &SynthesisError) -> i32 {
    match err {
        SynthesisError::TaskFailed(_) => 1,
        SynthesisError::Transport(_) => 69,       // EX_UNAVAILABLE
        SynthesisError::Sink(_) => 74,            // EX_IOERR
        SynthesisError::DeadlineExceeded(_) => 75, // EX_TEMPFAIL
        SynthesisError::Protocol(_) => 76,        // EX_PROTOCOL
        SynthesisError::Configuration(_) => 78,   // EX_CONFIG
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_nominal_options() {
        let cli = Cli::parse_from(["voxline", "hello"]);
        assert_eq!(cli.output, PathBuf::from("output.mp3"));
        assert_eq!(cli.model, "cosyvoice-v1");
        assert_eq!(cli.voice, "longxiaochun");
        assert_eq!(cli.format, AudioFormat::Mp3);
        assert_eq!(cli.sample_rate, 22_050);
        assert_eq!(cli.volume, 50);
    }

    #[test]
    fn overrides_are_parsed() {
        let cli = Cli::parse_from([
            "voxline", "hello", "-o", "say.wav", "--format", "wav", "--volume", "80",
            "--timeout", "30",
        ]);
        assert_eq!(cli.output, PathBuf::from("say.wav"));
        assert_eq!(cli.format, AudioFormat::Wav);
        assert_eq!(cli.volume, 80);
        assert_eq!(cli.timeout_secs, Some(30));
    }

    #[test]
    fn configuration_errors_map_to_ex_config() {
        let err = SynthesisError::Configuration("no key".to_string());
        assert_eq!(exit_code(&err), 78);
        assert_eq!(exit_code(&SynthesisError::TaskFailed(String::new())), 1);
    }
}
