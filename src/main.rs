//! say2file command-line entry point.

use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use say2file::config::{Overrides, Settings, resolve_session};
use say2file::core::orchestrator::{BatchOptions, Orchestrator};
use say2file::core::tts::create_provider;

#[derive(Parser)]
#[command(
    name = "say2file",
    version,
    about = "Synthesize text to speech and write the audio to files",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Text to synthesize. All arguments are joined into one line; use
    /// --input for multi-line input.
    text: Vec<String>,

    /// TTS provider: elevenlabs or ibm-watson
    #[arg(short, long)]
    provider: Option<String>,

    /// Voice id (required for elevenlabs; defaults to a Watson voice otherwise)
    #[arg(short, long)]
    voice: Option<String>,

    /// Output format family: mp3, wav or pcm
    #[arg(short, long)]
    format: Option<String>,

    /// Sample rate in Hz (wav/pcm) or bitrate in kbit/s (mp3)
    #[arg(short, long)]
    rate: Option<u32>,

    /// Provider-specific model id
    #[arg(short, long)]
    model: Option<String>,

    /// Artifact name root; may include a directory prefix
    #[arg(short, long, default_value = "audio")]
    out: String,

    /// Write one artifact per input line instead of a single joined artifact
    #[arg(short, long)]
    split: bool,

    /// Read input lines from a file, or from stdin with '-'
    #[arg(short, long)]
    input: Option<String>,

    /// Deadline in seconds for each provider request
    #[arg(short, long)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the voices the provider offers
    Voices {
        /// TTS provider: elevenlabs or ibm-watson
        #[arg(short, long)]
        provider: Option<String>,
    },
    /// Show account usage for the provider, where supported
    Status {
        /// TTS provider: elevenlabs or ibm-watson
        #[arg(short, long)]
        provider: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine; credentials may come from the real environment.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Voices { provider }) => list_voices(provider).await,
        Some(Commands::Status { provider }) => show_status(provider).await,
        None => synthesize(cli).await,
    }
}

async fn synthesize(cli: Cli) -> Result<()> {
    let lines = read_input(&cli.input, &cli.text)?;
    if lines.iter().all(|line| line.trim().is_empty()) {
        bail!("no input text; pass text arguments or --input");
    }

    let settings = Settings::resolve(Overrides {
        provider: cli.provider,
        voice: cli.voice,
        format: cli.format,
        rate: cli.rate,
        model: cli.model,
        output_root: Some(cli.out),
        split: cli.split,
        timeout_secs: cli.timeout,
    })?;

    if let Some(dir) = Path::new(&settings.output_root).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        }
    }

    let provider = create_provider(&settings.provider, settings.session.clone())?;
    let orchestrator = Orchestrator::new(provider);

    let options = BatchOptions {
        voice_id: settings.voice_id.clone(),
        output: settings.output,
        model_hint: settings.model_hint.clone(),
        output_root: settings.output_root.clone(),
        split: settings.split,
        timeout: settings.timeout,
    };
    let report = orchestrator.run_batch(&lines, &options).await;

    if report.segments.is_empty() {
        bail!("no synthesizable input after dropping blank and comment lines");
    }

    for segment in &report.segments {
        match &segment.result {
            Ok(bytes) => println!("wrote {} ({bytes} bytes)", segment.artifact),
            Err(e) => println!("failed {}: {e}", segment.artifact),
        }
    }
    if let Some(quota) = &report.quota {
        println!(
            "account: tier {}, {}/{} characters used",
            quota.tier, quota.characters_used, quota.character_limit
        );
    }
    if report.failed() > 0 {
        println!("{} of {} segments failed", report.failed(), report.segments.len());
    }

    Ok(())
}

async fn list_voices(provider: Option<String>) -> Result<()> {
    let (name, session) = resolve_session(provider)?;
    let provider = create_provider(&name, session)?;
    let voices = provider.fetch_voices().await?;

    if voices.is_empty() {
        println!("no voices reported by {name}");
        return Ok(());
    }
    for voice in voices {
        println!("{}\t{}", voice.id, voice.name);
    }
    Ok(())
}

async fn show_status(provider: Option<String>) -> Result<()> {
    let (name, session) = resolve_session(provider)?;
    let provider = create_provider(&name, session)?;

    match provider.fetch_account_status().await? {
        Some(quota) => {
            println!("provider: {name}");
            println!("tier: {}", quota.tier);
            println!(
                "characters: {}/{}",
                quota.characters_used, quota.character_limit
            );
            if let Some(reset) = quota.reset_unix {
                println!("resets at: {reset} (unix)");
            }
        }
        None => println!("{name} does not report account usage"),
    }
    Ok(())
}

/// Gather input lines: a file (or stdin with '-') when `--input` is given,
/// otherwise the positional arguments joined into a single line.
fn read_input(input: &Option<String>, text: &[String]) -> Result<Vec<String>> {
    match input {
        Some(path) if path == "-" => {
            let stdin = std::io::stdin();
            let lines: Result<Vec<String>, _> = stdin.lock().lines().collect();
            lines.context("failed to read stdin")
        }
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("failed to open input file {path}"))?;
            let lines: Result<Vec<String>, _> = BufReader::new(file).lines().collect();
            lines.with_context(|| format!("failed to read input file {path}"))
        }
        None => {
            if text.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(vec![text.join(" ")])
            }
        }
    }
}
