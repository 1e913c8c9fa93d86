//! Metronome Sync
//!
//! Mounts a handful of peers on one shared session and drives them from a REPL.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metronome_sync::audio::ConsoleClick;
use metronome_sync::cli::{self, Flow, ReplCommand, ReplSession};
use metronome_sync::config::{AppConfig, ConfigWatcher};
use metronome_sync::controller::ControllerHandle;
use metronome_sync::host::{mount_widget, teardown_channel, unmount_all, HostContext};
use metronome_sync::store::SyncHub;

/// Metronome Sync - one tempo shared by every peer of a session
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults are used if it does not exist)
    #[arg(short, long, default_value = "metronome.yaml")]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Number of peers to mount (overrides the config)
    #[arg(short, long)]
    peers: Option<usize>,

    /// Session key (overrides the config)
    #[arg(short, long)]
    session: Option<String>,

    /// Ring the terminal bell on every click
    #[arg(long)]
    bell: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting Metronome Sync...");
    info!("Configuration file: {}", args.config.display());

    // Hot-reload only when there is a file to watch
    let (config_watcher, mut config) = if args.config.exists() {
        let (watcher, config) = ConfigWatcher::new(&args.config).await?;
        info!("Configuration loaded with hot-reload enabled");
        (Some(watcher), config)
    } else {
        info!("No config file, using defaults");
        (None, AppConfig::default())
    };

    if let Some(peers) = args.peers {
        config.session.peers = peers;
    }
    if let Some(session) = args.session.clone() {
        config.session.key = session;
    }
    config.validate()?;

    run_app(config, config_watcher, args.bell).await?;

    info!("Metronome Sync shutdown complete");
    Ok(())
}

async fn run_app(
    config: AppConfig,
    mut config_watcher: Option<ConfigWatcher>,
    bell: bool,
) -> Result<()> {
    let hub = SyncHub::new();
    let (trigger, teardown) = teardown_channel();
    let ctx = HostContext::new(hub, config.session.key.clone(), teardown);

    let peers: Vec<ControllerHandle> = (1..=config.session.peers)
        .map(|n| {
            let peer = format!("p{}", n);
            let click = Box::new(ConsoleClick::new(peer.clone(), bell));
            mount_widget(&ctx, peer, &config.metronome, click)
        })
        .collect();

    info!(
        "Mounted {} peers on session '{}' (bpm {})",
        peers.len(),
        ctx.session_key(),
        config.metronome.range()
    );

    // rustyline blocks; a detached thread does not hold up runtime shutdown
    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);
    std::thread::spawn(move || {
        if let Err(e) = cli::run_repl(line_tx) {
            warn!("REPL error: {:#}", e);
        }
    });

    let mut session = ReplSession::new(peers);
    println!("Type 'help' for commands");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = line_rx.recv() => {
                let Some(line) = line else { break };
                if session.execute(ReplCommand::parse(&line)).await == Flow::Quit {
                    break;
                }
            }
            Some(new_config) = next_config(&mut config_watcher) => {
                let range = new_config.metronome.range();
                info!("Applying new bpm limits {}", range);
                for peer in session.peers() {
                    peer.update_limits(range);
                }
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    info!("Unmounting peers...");
    trigger.destroy();
    unmount_all(&ctx, session.peers()).await;

    Ok(())
}

/// Next reloaded config, or never when hot-reload is off
async fn next_config(watcher: &mut Option<ConfigWatcher>) -> Option<AppConfig> {
    match watcher {
        Some(watcher) => watcher.next_config().await,
        None => std::future::pending().await,
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
