//! voxmix-ap - command-line front end
//!
//! Wires the audio system from configuration and drives it headless: plays
//! voice keys through the voice scheduler, adjusts channel volumes, and
//! prints every emitted event as a JSON line on stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voxmix_ap::audio::{InMemoryMixer, MixerBackend};
use voxmix_ap::AudioSystem;
use voxmix_common::config::AudioConfig;
use voxmix_common::events::VoxEvent;
use voxmix_common::ChannelId;

/// Command-line arguments for voxmix-ap
#[derive(Parser, Debug)]
#[command(name = "voxmix-ap")]
#[command(about = "Channel volume manager and voice queue player")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "VOXMIX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play voice keys; several keys form a queued run
    Play {
        /// Seconds between queued clips
        #[arg(short, long)]
        delay: Option<f32>,

        /// Fetch clips from the streaming base instead of the local stores
        #[arg(long)]
        streaming: bool,

        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Set a channel's volume (0-1)
    Volume { channel: String, volume: f32 },

    /// Toggle a channel's mute state
    Mute { channel: String },

    /// Print channel state and mixer parameters
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        AudioConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    let default_filter = format!(
        "voxmix_ap={0},voxmix_common={0}",
        config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting voxmix-ap v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        info!("Config: {}", path.display());
    }

    if let Command::Play { streaming: true, .. } = &args.command {
        config.voice.streaming = true;
    }

    let mixer = Arc::new(InMemoryMixer::new());
    let backend: Arc<dyn MixerBackend> = mixer.clone();
    let system = AudioSystem::from_config(&config, Some(backend))
        .context("Failed to initialize audio system")?;
    let mut events = system.state.subscribe_events();

    match args.command {
        Command::Play { delay, keys, .. } => {
            let delay = delay.unwrap_or(config.voice.default_delay_secs);
            if !system.voice.play(delay, &keys) {
                warn!("Voice output refused the request");
            } else {
                run_until_idle(&system, &mut events).await;
            }
        }
        Command::Volume { channel, volume } => {
            let channel: ChannelId = channel.parse()?;
            system.channels.write().await.set_volume(channel, volume);
            print_status(&system, &mixer).await?;
        }
        Command::Mute { channel } => {
            let channel: ChannelId = channel.parse()?;
            let muted = system.channels.write().await.toggle_mute(channel);
            info!("{} muted: {}", channel, muted);
            print_status(&system, &mixer).await?;
        }
        Command::Status => print_status(&system, &mixer).await?,
    }

    system.shutdown().await;
    drain_events(&mut events);
    Ok(())
}

/// Print events until the voice scheduler is idle or Ctrl+C arrives
async fn run_until_idle(system: &AudioSystem, events: &mut broadcast::Receiver<VoxEvent>) {
    let idle = system.voice.wait_idle();
    tokio::pin!(idle);

    loop {
        tokio::select! {
            _ = &mut idle => break,
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event printer lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping voice playback");
                system.voice.stop();
                break;
            }
        }
    }
}

fn drain_events(events: &mut broadcast::Receiver<VoxEvent>) {
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }
}

fn print_event(event: &VoxEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Failed to serialize {} event: {}", event.name(), e),
    }
}

/// One JSON line per channel record, then the raw mixer parameters
async fn print_status(system: &AudioSystem, mixer: &InMemoryMixer) -> Result<()> {
    let channels = system.channels.read().await;
    for channel in ChannelId::ALL {
        let record = serde_json::json!({
            "state": channels.state(channel),
            "live_volume": channels.get_volume(channel),
        });
        println!("{}", record);
    }

    let parameters: serde_json::Map<String, serde_json::Value> = mixer
        .snapshot()
        .into_iter()
        .map(|(name, value)| (name, serde_json::Value::from(value)))
        .collect();
    println!(
        "{}",
        serde_json::to_string(&serde_json::json!({ "mixer": parameters }))
            .context("Failed to serialize mixer snapshot")?
    );
    Ok(())
}
