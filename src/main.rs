use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use speech_nodes::audio::AudioBuffer;
use speech_nodes::config::Config;
use speech_nodes::language::Language;
use speech_nodes::models::{AlignerModel, AsrModel, Device, Precision};
use speech_nodes::{nodes, telemetry};

/// Speech recognition and forced alignment nodes
#[derive(Parser)]
#[command(name = "speech-nodes", version)]
struct Cli {
    /// Config file (defaults to ~/.speech-nodes.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured device (cpu, cuda:N)
    #[arg(long, global = true)]
    device: Option<Device>,

    /// Override the configured precision (float32, float16, int8)
    #[arg(long, global = true)]
    precision: Option<Precision>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the node registry as JSON
    Nodes,

    /// Fetch a model into the local cache
    Download {
        /// Registered model name
        model: String,
    },

    /// Transcribe a WAV file
    Transcribe {
        /// Input WAV file
        audio: PathBuf,

        /// Model name
        #[arg(long, default_value_t = AsrModel::default().name().to_owned())]
        model: String,

        /// Language name or code, Auto to detect
        #[arg(long, default_value = "Auto")]
        language: Language,
    },

    /// Time-align a transcript against a WAV file
    Align {
        /// Input WAV file
        audio: PathBuf,

        /// Transcript text
        #[arg(long, conflicts_with = "text_file")]
        text: Option<String>,

        /// File holding the transcript
        #[arg(long)]
        text_file: Option<PathBuf>,

        /// Aligner model name
        #[arg(long, default_value_t = AlignerModel::default().name().to_owned())]
        model: String,

        /// Language name or code
        #[arg(long, default_value = "English")]
        language: Language,

        /// Emit one row per aligned unit instead of per sentence
        #[arg(long)]
        no_segment: bool,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(device) = cli.device {
        config.models.device = device;
    }
    if let Some(precision) = cli.precision {
        config.models.precision = precision;
    }
    Ok(config)
}

fn read_audio(path: &Path) -> Result<AudioBuffer> {
    AudioBuffer::read_wav(path).with_context(|| format!("failed to read audio {}", path.display()))
}

fn download(config: &Config, name: &str) -> Result<PathBuf> {
    let precision = config.models.precision;
    let spec = if let Ok(model) = name.parse::<AsrModel>() {
        model.spec(precision)?
    } else {
        name.parse::<AlignerModel>()?.spec(precision)?
    };
    config.model_store()?.provision(&spec)
}

#[allow(clippy::print_stdout)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    telemetry::init(&config.telemetry)?;
    tracing::debug!(
        device = %config.models.device,
        precision = %config.models.precision,
        "config loaded"
    );

    match cli.command {
        Command::Nodes => {
            let registry = serde_json::to_string_pretty(&nodes::registry())?;
            println!("{registry}");
        }
        Command::Download { model } => {
            let dir = download(&config, &model)?;
            println!("{model}: {}", dir.display());
        }
        Command::Transcribe {
            audio,
            model,
            language,
        } => {
            let buffer = read_audio(&audio)?;
            let handle = nodes::load_asr_model(&config, model.parse()?)?;
            let out = nodes::transcribe(handle.as_ref(), &buffer, language)?;
            println!("language: {}", out.language);
            println!("{}", out.text);
        }
        Command::Align {
            audio,
            text,
            text_file,
            model,
            language,
            no_segment,
        } => {
            let transcript = match (text, text_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read transcript {}", path.display()))?,
                (None, None) => anyhow::bail!("either --text or --text-file is required"),
            };
            let buffer = read_audio(&audio)?;
            let handle = nodes::load_aligner(&config, model.parse()?)?;
            let out = nodes::align(handle.as_ref(), &buffer, &transcript, language, !no_segment)?;
            println!("{}", out.timestamps);
        }
    }

    Ok(())
}
