use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voice_ask::config::redact;
use voice_ask::permission::LineSource;
use voice_ask::{
    permission, AudioSource, CommandSynthesizer, Config, GenerationClient, InteractionState,
    Orchestrator, OrchestratorHandle, Services, Snapshot, SpeechClient, WavRecorder,
};

/// voice-ask - speak a question, hear the answer
#[derive(Parser)]
#[command(name = "voice-ask", version, about)]
struct Cli {
    /// Configuration file (without extension; toml/yaml/json are detected)
    #[arg(short, long, default_value = "config/voice-ask")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP control API
    Serve,
    /// Ask one question from the terminal
    Ask {
        /// Read the question from a WAV file instead of the microphone
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Validate configuration and print a summary
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Fail fast: nothing starts without a valid configuration
    let cfg = Config::load_validated(&cli.config)?;
    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::CheckConfig => {
            print_config(&cfg);
            Ok(())
        }
        Command::Serve => serve(&cfg, LineSource::stdin()).await,
        Command::Ask { input } => {
            // Permission prompt and Enter presses read the same buffered stdin
            let terminal = LineSource::stdin();
            let source = match input {
                Some(path) => AudioSource::File(path),
                None => AudioSource::Microphone {
                    command: cfg.audio.capture_command.clone(),
                },
            };
            let services = build_services(&cfg, source, terminal.clone())?;
            let handle = Orchestrator::spawn(cfg.session_config(), services);

            let result = tokio::select! {
                result = ask(&handle, &terminal) => result,
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    Ok(())
                }
            };

            handle.shutdown().await;
            result
        }
    }
}

fn build_services(cfg: &Config, source: AudioSource, terminal: LineSource) -> Result<Services> {
    Ok(Services {
        permission: Arc::from(permission::from_mode(cfg.permission.microphone, terminal)),
        capture: Box::new(WavRecorder::new(source, cfg.recordings_dir())),
        transcriber: Arc::new(SpeechClient::new(&cfg.speech, cfg.audio.sample_rate)?),
        generator: Arc::new(GenerationClient::new(&cfg.generation)?),
        synthesizer: Arc::new(CommandSynthesizer::new(&cfg.synthesis)),
    })
}

async fn serve(cfg: &Config, terminal: LineSource) -> Result<()> {
    let source = AudioSource::Microphone {
        command: cfg.audio.capture_command.clone(),
    };
    let handle = Orchestrator::spawn(cfg.session_config(), build_services(cfg, source, terminal)?);
    let app = voice_ask::create_router(voice_ask::AppState::new(handle.clone()));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    handle.shutdown().await;
    Ok(())
}

async fn ask(handle: &OrchestratorHandle, terminal: &LineSource) -> Result<()> {
    if !handle.begin().await.is_accepted() {
        bail!("Could not start an interaction");
    }

    let snapshot = handle
        .wait_for(|s| s.state != InteractionState::RequestingPermission)
        .await;
    if snapshot.state != InteractionState::Recording {
        report(&snapshot);
        return Ok(());
    }

    println!("Recording... press Enter to stop.");
    terminal.next_line().await?;
    handle.end().await;

    let mut snapshot = handle.wait_for(|s| !s.state.is_active()).await;
    report(&snapshot);

    while snapshot.controls.replay_enabled {
        println!("Press Enter to hear the answer again, or type q to quit.");
        match terminal.next_line().await? {
            Some(line) if line.trim().is_empty() => {
                handle.replay().await;
                snapshot = handle.wait_for(|s| !s.state.is_active()).await;
            }
            _ => break,
        }
    }

    Ok(())
}

fn report(snapshot: &Snapshot) {
    if let Some(transcript) = &snapshot.transcript {
        println!("You: {}", transcript);
    }
    if let Some(answer) = &snapshot.answer {
        println!("Answer: {}", answer);
    }
    if let Some(error) = &snapshot.last_error {
        println!("Error: {}", error);
    }
}

fn print_config(cfg: &Config) {
    println!("service:     {}", cfg.service.name);
    println!("http:        {}:{}", cfg.service.http.bind, cfg.service.http.port);
    println!("recordings:  {}", cfg.audio.recordings_path);
    println!(
        "capture:     {} Hz, {} ch, {:?}",
        cfg.audio.sample_rate, cfg.audio.channels, cfg.audio.capture_command
    );
    println!("speech key:  {}", redact(&cfg.speech.api_key));
    println!(
        "speech:      {} ({}, {})",
        cfg.speech.endpoint, cfg.speech.language_code, cfg.speech.model
    );
    println!("gen key:     {}", redact(&cfg.generation.api_key));
    println!("generation:  {} ({})", cfg.generation.endpoint, cfg.generation.model);
    println!("vision key:  {}", redact(&cfg.vision.api_key));
    println!(
        "synthesis:   {} ({}, rate {}, pitch {})",
        cfg.synthesis.command, cfg.synthesis.language, cfg.synthesis.rate, cfg.synthesis.pitch
    );
    println!("permission:  {:?}", cfg.permission.microphone);
}
