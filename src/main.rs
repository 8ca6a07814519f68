//! voice-studio CLI - synthesize speech and manage saved voice profiles.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use voice_studio::{
    audio::{AudioFormat, FfmpegTranscoder},
    catalog,
    config::StudioConfig,
    engines::coqui::CoquiCliEngine,
    profile::Gender,
    resolver::UploadedAudio,
    samples::{discover_samples, find_sample},
    store::ProfileStore,
    studio::{RunRequestBuilder, Studio},
    StudioError,
};

#[derive(Parser, Debug)]
#[command(
    name = "voice-studio",
    version,
    about = "Text-to-speech with reusable voice profiles",
    long_about = "Generate speech with Coqui TTS models, optionally cloning a reference voice \
                  from an uploaded file, a saved profile or a built-in example clip.\n\n\
                  Requires the Coqui `tts` CLI and `ffmpeg` on PATH."
)]
struct Cli {
    /// JSON configuration file (paths, tool binaries)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize text to an audio file plus a placeholder subtitle
    Synth(SynthArgs),
    /// Manage saved voice profiles
    #[command(subcommand)]
    Profiles(ProfilesCommand),
    /// List the available language/model choices
    Models,
    /// List the built-in example voice clips
    Samples,
}

#[derive(clap::Args, Debug)]
struct SynthArgs {
    /// Text to synthesize (keep it under ~500 characters per run)
    #[arg(short, long)]
    text: String,

    /// Language/model label (see `voice-studio models`)
    #[arg(short, long, default_value = "")]
    language: String,

    /// Audio file (WAV or MP3) to clone the voice from
    #[arg(short, long)]
    upload: Option<PathBuf>,

    /// Position of a saved profile to reuse (see `voice-studio profiles list`)
    #[arg(short, long)]
    profile: Option<usize>,

    /// Example clip label or file name (see `voice-studio samples`)
    #[arg(short, long)]
    example: Option<String>,

    /// Save the reference voice as a new profile with this name
    #[arg(short, long)]
    save_as: Option<String>,

    /// Gender recorded with a new profile
    #[arg(short, long, default_value = "unspecified")]
    gender: Gender,

    /// Output audio format
    #[arg(short, long, default_value = "wav", value_parser = ["wav", "mp3", "ogg"])]
    format: String,

    /// Run synthesis on the GPU when available
    #[arg(long)]
    gpu: bool,
}

#[derive(Subcommand, Debug)]
enum ProfilesCommand {
    /// Show every saved profile with its position
    List,
    /// Delete profiles and their audio by position
    Delete {
        #[arg(required = true)]
        positions: Vec<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => StudioConfig::from_json_file(path)?,
        None => StudioConfig::default(),
    };

    match cli.command {
        Command::Synth(args) => {
            config.use_gpu |= args.gpu;
            synth(config, args)?;
        }
        Command::Profiles(ProfilesCommand::List) => list_profiles(&config)?,
        Command::Profiles(ProfilesCommand::Delete { positions }) => {
            delete_profiles(&config, positions)?
        }
        Command::Models => {
            for entry in catalog::MODELS.iter() {
                let cloning = if entry.supports_cloning() { " [voice cloning]" } else { "" };
                println!("{:<16} {}{cloning}", entry.label, entry.model_id);
            }
        }
        Command::Samples => {
            let samples = discover_samples(&config.samples_dir)?;
            if samples.is_empty() {
                println!("No example clips in {}", config.samples_dir.display());
            }
            for clip in samples {
                println!("{}", clip.label);
            }
        }
    }

    Ok(())
}

fn synth(config: StudioConfig, args: SynthArgs) -> Result<(), Box<dyn std::error::Error>> {
    let transcoder = FfmpegTranscoder::from_config(&config);
    let engine = CoquiCliEngine::from_config(&config);

    // A saved profile also fixes the language unless one was given.
    let language_given = !args.language.trim().is_empty();

    let mut request = RunRequestBuilder::default();
    request
        .text(args.text)
        .language(args.language)
        .gender(args.gender)
        .output_format(args.format.parse::<AudioFormat>()?);

    if let Some(path) = &args.upload {
        request.upload(UploadedAudio::from_file(path)?);
    }
    if let Some(position) = args.profile {
        let profiles = ProfileStore::from_config(&config, &transcoder).load()?;
        let profile = profiles
            .get(position)
            .cloned()
            .ok_or_else(|| format!("No saved profile at position {position}"))?;
        if !language_given {
            request.language(profile.language.clone());
        }
        request.profile(profile);
    }
    if let Some(key) = &args.example {
        let samples = discover_samples(&config.samples_dir)?;
        let clip = find_sample(&samples, key)
            .ok_or_else(|| format!("No example clip named '{key}'"))?;
        request.example(clip.path.clone());
    }
    if let Some(name) = args.save_as {
        request.save_as(name);
    }

    let mut studio = Studio::new(config, engine, transcoder);
    let outcome = studio.run(request.build()?)?;

    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    println!("Audio saved to: {}", outcome.audio_path.display());
    println!("Subtitle saved to: {}", outcome.subtitle_path.display());
    if let Some(profile) = &outcome.saved_profile {
        println!("Profile '{}' saved!", profile.name);
    }
    Ok(())
}

fn list_profiles(config: &StudioConfig) -> Result<(), StudioError> {
    let store = ProfileStore::from_config(config, FfmpegTranscoder::from_config(config));
    let profiles = store.load()?;
    if profiles.is_empty() {
        println!("No saved profiles yet.");
        return Ok(());
    }

    for (position, profile) in profiles.iter().enumerate() {
        println!("[{position}] {}", profile.display_label());
        println!("    model:    {}", profile.model_id);
        println!("    language: {}", profile.language);
        println!("    created:  {}", profile.created_at);
        if profile.audio_available() {
            println!("    audio:    {}", profile.audio_path.display());
        } else {
            println!("    audio:    (missing) {}", profile.audio_path.display());
        }
    }
    Ok(())
}

fn delete_profiles(config: &StudioConfig, positions: Vec<usize>) -> Result<(), StudioError> {
    let store = ProfileStore::from_config(config, FfmpegTranscoder::from_config(config));
    let positions: BTreeSet<usize> = positions.into_iter().collect();
    let report = store.delete(&positions)?;

    for warning in &report.warnings {
        eprintln!("warning: could not remove audio: {warning}");
    }
    for profile in &report.removed {
        println!("Deleted profile '{}'", profile.display_label());
    }
    if report.removed.is_empty() {
        println!("Nothing deleted.");
    }
    Ok(())
}
