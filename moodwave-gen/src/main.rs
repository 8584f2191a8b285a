//! Moodwave CLI
//!
//! `moodwave plan` prints a mood trajectory, `moodwave run` drives a full
//! generation session against a simulated player.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use moodwave_common::config::{
    default_config_path, load_or_default, write_toml_config, TomlConfig,
};
use moodwave_common::events::{EventBus, MoodwaveEvent};
use moodwave_gen::config::{CliOverrides, PipelineConfig};
use moodwave_gen::context::{
    EnvironmentSource, HealthSnapshot, HealthSource, StaticHealthSource,
};
use moodwave_gen::jobs::{build_http_client, Provider};
use moodwave_gen::logging::init_tracing;
use moodwave_gen::notification::NotificationChannel;
use moodwave_gen::orchestrator::{Collaborators, GenerationOutcome, Orchestrator};
use moodwave_gen::player::SimulatedPlayer;
use moodwave_gen::prompt::UserInput;
use moodwave_gen::trajectory;

#[derive(Parser, Debug)]
#[command(name = "moodwave")]
#[command(about = "Generate a queue of songs walking from one mood to another")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/moodwave/moodwave.toml)
    #[arg(short, long, global = true, env = "MOODWAVE_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder for downloaded artifacts
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the mood trajectory between two moods
    Plan {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, default_value_t = trajectory::DEFAULT_STEPS)]
        steps: usize,
    },
    /// List the mood catalog
    Moods,
    /// Run a generation session with a simulated player
    Run(RunArgs),
    /// Write a default config file
    InitConfig {
        /// Target path (default: the config location)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
        /// Print the default config instead of writing it
        #[arg(long)]
        stdout: bool,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    age: String,
    /// Current mood
    #[arg(long)]
    from: String,
    /// Desired mood
    #[arg(long)]
    to: String,
    #[arg(long)]
    genre: String,
    #[arg(long)]
    band: String,
    #[arg(long)]
    activity: String,

    #[arg(long)]
    heart_rate: Option<f64>,
    #[arg(long)]
    steps_count: Option<u64>,

    /// Use the mock job client
    #[arg(long)]
    mock: bool,
    /// suno, replicate or mureka
    #[arg(long)]
    provider: Option<Provider>,
    /// Trajectory length
    #[arg(long)]
    steps: Option<usize>,
    /// Listen-before-generate time in milliseconds
    #[arg(long)]
    listen_ms: Option<u64>,

    /// Stop after this many songs (0 = whole trajectory)
    #[arg(long, default_value_t = 0)]
    songs: usize,
    /// Playback speed factor for the simulated player
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Plan { from, to, steps } => {
            for (index, mood) in trajectory::plan(&from, &to, steps).iter().enumerate() {
                println!("{:>2}  {}", index, mood);
            }
            Ok(())
        }
        Command::Moods => {
            for label in trajectory::sorted_labels() {
                println!("{}", label);
            }
            Ok(())
        }
        Command::InitConfig {
            path,
            force,
            stdout,
        } => init_config(path.or(cli.config), force, stdout),
        Command::Run(args) => {
            let toml = load_or_default(cli.config.as_deref());
            init_tracing(&toml.logging).context("Failed to initialize logging")?;
            run(toml, cli.root_folder, args).await
        }
    }
}

fn init_config(path: Option<PathBuf>, force: bool, stdout: bool) -> Result<()> {
    let config = TomlConfig::default();
    if stdout {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let Some(path) = path.or_else(default_config_path) else {
        bail!("No config location available; pass --path");
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_toml_config(&config, &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn run(toml: TomlConfig, root_folder: Option<PathBuf>, args: RunArgs) -> Result<()> {
    let overrides = CliOverrides {
        root_folder,
        provider: args.provider,
        mock: args.mock,
        listen_before_generate_ms: args.listen_ms,
        trajectory_steps: args.steps,
    };
    let pipeline = PipelineConfig::resolve(&toml, &overrides)?;
    info!(
        provider = %pipeline.provider,
        mock = pipeline.mock,
        root_folder = %pipeline.root_folder.display(),
        "Pipeline configured"
    );

    let input = UserInput {
        name: args.name,
        age: args.age,
        current_mood: args.from,
        desired_mood: args.to,
        favorite_genre: args.genre,
        favorite_band: args.band,
        activity: args.activity,
    };

    let http = build_http_client()?;
    let notifications = NotificationChannel::new();
    let events = EventBus::new(256);

    let health = StaticHealthSource::new(HealthSnapshot {
        heart_rate: args.heart_rate,
        steps: args.steps_count,
    });
    let environment: Arc<dyn EnvironmentSource> = Arc::new(pipeline.environment_source(&http));
    let collaborators = Collaborators {
        generator: Arc::new(pipeline.job_client(&http, notifications.clone())),
        lyrics: pipeline.lyrics_generator(&http, &input),
        health: Arc::new(health),
        environment,
    };

    let orchestrator = Orchestrator::new(
        pipeline.orchestrator.clone(),
        collaborators,
        notifications,
        events,
    );
    let event_log = tokio::spawn(log_events(orchestrator.subscribe_events()));

    let initial_health = health.fetch_health_snapshot().await;
    match orchestrator.start(input, Some(initial_health)).await {
        GenerationOutcome::Filled { .. } => {}
        other => {
            orchestrator.shutdown();
            bail!("First song was not generated: {:?}", other);
        }
    }

    let player = SimulatedPlayer::new(orchestrator.clone(), args.speed, args.songs);
    tokio::select! {
        played = player.run() => info!(played, "Session finished"),
        _ = shutdown_signal() => info!("Interrupted"),
    }

    orchestrator.shutdown();
    event_log.abort();

    let snapshot = orchestrator.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Mirror orchestrator events into the log
async fn log_events(mut rx: tokio::sync::broadcast::Receiver<MoodwaveEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => info!(event = event.kind(), "{}", json),
                Err(e) => warn!(error = %e, "Unserializable event"),
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
