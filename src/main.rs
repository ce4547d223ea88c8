use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::io::Read;
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use voiceauth::cli::{Cli, Commands, ConfigAction, SpokenRequest};
use voiceauth::config::Config;
use voiceauth::pipeline::{EnrollResponse, VerifyResponse};
use voiceauth::VoiceAuth;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Challenge { json } => {
            let app = open_app(cli.config.as_deref())?;
            let phrase = app.challenge();
            if json {
                println!("{}", serde_json::json!({ "phrase": phrase }));
            } else {
                println!("{}", phrase);
            }
        }
        Commands::Enroll(request) => {
            let app = open_app(cli.config.as_deref())?;
            let enrolled = handle_enroll(&app, request).await?;
            if !enrolled {
                std::process::exit(1);
            }
        }
        Commands::Verify(request) => {
            let app = open_app(cli.config.as_deref())?;
            let authenticated = handle_verify(&app, request).await?;
            if !authenticated {
                std::process::exit(1);
            }
        }
        Commands::Exists { user } => {
            let app = open_app(cli.config.as_deref())?;
            let response = app.user_exists(&user);
            println!("{}", serde_json::to_string(&response)?);
            if !response.exists {
                std::process::exit(1);
            }
        }
        Commands::Delete { user } => {
            let app = open_app(cli.config.as_deref())?;
            if app.delete_user(&user) {
                println!("{}", format!("Removed voiceprint for '{}'", user).green());
            } else {
                eprintln!("No voiceprint removed for '{}'", user);
                std::process::exit(1);
            }
        }
        Commands::Preload => {
            let app = open_app(cli.config.as_deref())?;
            let started = Instant::now();
            app.preload()?;
            println!(
                "{} in {:.1}s",
                "Models loaded".green(),
                started.elapsed().as_secs_f64()
            );
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "voiceauth",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` wins over the flags.
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config), which must exist
/// 2. Default config path (~/.config/voiceauth/config.toml)
/// 3. Built-in defaults
///
/// Environment variable overrides apply on top of all three.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    Ok(config.with_env_overrides()?)
}

fn open_app(custom_path: Option<&Path>) -> Result<VoiceAuth> {
    let config = load_config(custom_path)?;
    Ok(VoiceAuth::open(config)?)
}

/// Read the recording from a file, or from stdin when the path is `-`.
fn read_audio(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut bytes = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Failed to read audio from stdin")?;
        return Ok(bytes);
    }
    std::fs::read(path).with_context(|| format!("Failed to read audio from {}", path.display()))
}

async fn handle_enroll(app: &VoiceAuth, request: SpokenRequest) -> Result<bool> {
    let audio = read_audio(&request.audio)?;
    let outcome = app
        .enroll_async(request.user.clone(), audio, request.phrase.clone())
        .await?;
    let response = EnrollResponse::from(&outcome);

    if request.json {
        println!("{}", serde_json::to_string(&response)?);
    } else if response.success {
        println!(
            "{} {}",
            "✓".green(),
            format!("Voiceprint enrolled for '{}'", request.user).green()
        );
        if let Some(transcription) = &response.transcription {
            println!("  {} {}", "Heard:".dimmed(), transcription);
        }
    } else {
        eprintln!("{} {}", "✗".red(), response.message.red());
        print_mismatch(response.transcription.as_deref(), response.expected.as_deref());
    }
    Ok(response.success)
}

async fn handle_verify(app: &VoiceAuth, request: SpokenRequest) -> Result<bool> {
    let audio = read_audio(&request.audio)?;
    let outcome = app
        .verify_async(request.user.clone(), audio, request.phrase.clone())
        .await?;
    let response = VerifyResponse::from(&outcome);

    if request.json {
        println!("{}", serde_json::to_string(&response)?);
    } else {
        if response.authenticated {
            println!("{} {}", "✓".green(), response.message.green());
        } else {
            eprintln!("{} {}", "✗".red(), response.message.red());
        }
        if let (Some(similarity), Some(threshold)) = (response.similarity, response.threshold) {
            println!(
                "  {} {:.3} (threshold {:.2})",
                "Similarity:".dimmed(),
                similarity,
                threshold
            );
        }
        print_mismatch(response.transcription.as_deref(), response.expected.as_deref());
    }
    Ok(response.authenticated)
}

fn print_mismatch(transcription: Option<&str>, expected: Option<&str>) {
    if let (Some(heard), Some(expected)) = (transcription, expected) {
        eprintln!("  {} {}", "Expected:".dimmed(), expected);
        eprintln!("  {}    {}", "Heard:".dimmed(), heard.yellow());
    }
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_display_toml()?);
        }
        ConfigAction::Path => {
            let path = custom_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::default_path);
            println!("{}", path.display());
        }
    }
    Ok(())
}
