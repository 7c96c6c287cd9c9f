//! # kinowatch
//!
//! Telegram bot that scrapes a TV guide for a movie's broadcast listings
//! and pushes them to subscribers once per day.
//!
//! Usage:
//!   kinowatch run                # Start the bot
//!   kinowatch broadcast          # One-shot fan-out to all subscribers
//!   kinowatch schedule           # Print today's listing to stdout
//!   kinowatch config show        # Show configuration

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kinowatch_agent::Dispatcher;
use kinowatch_channels::{TelegramChannel, TelegramConfig};
use kinowatch_core::traits::ScheduleSource;
use kinowatch_core::KinowatchConfig;
use kinowatch_guide::HttpGuide;
use kinowatch_registry::Registry;
use kinowatch_scheduler::SchedulerEngine;

#[derive(Parser)]
#[command(
    name = "kinowatch",
    version,
    about = "Daily movie broadcast notifier for Telegram"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot: event dispatcher + daily broadcast scheduler
    Run,

    /// Send today's schedule to all subscribers now
    Broadcast,

    /// Fetch today's schedule and print it
    Schedule,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write a default config file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "kinowatch=debug,kinowatch_core=debug,kinowatch_channels=debug,kinowatch_scheduler=debug,kinowatch_agent=debug,kinowatch_registry=debug,kinowatch_guide=debug"
    } else {
        "kinowatch=info,kinowatch_core=info,kinowatch_channels=info,kinowatch_scheduler=info,kinowatch_agent=info,kinowatch_registry=info,kinowatch_guide=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = if let Some(path) = &cli.config {
        KinowatchConfig::load_from(std::path::Path::new(path))?
    } else {
        KinowatchConfig::load()?
    };

    match cli.command {
        Commands::Run => run(config).await,
        Commands::Broadcast => broadcast_once(config).await,
        Commands::Schedule => {
            let guide = HttpGuide::new(config.guide.clone());
            println!("{}", guide.fetch().await);
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigAction::Init => {
                config.save()?;
                println!(
                    "Config written to {}",
                    KinowatchConfig::default_path().display()
                );
                Ok(())
            }
        },
    }
}

/// Start the bot: Telegram long polling, event dispatcher, and the daily
/// trigger loop, sharing one registry. Runs until ctrl-c or a task dies.
async fn run(config: KinowatchConfig) -> Result<()> {
    let channel = connect(&config).await?;

    let registry = Arc::new(Registry::load(&config.registry_path).await);
    let guide: Arc<dyn ScheduleSource> = Arc::new(HttpGuide::new(config.guide.clone()));

    let events = channel.clone().start_polling();
    let dispatcher = Dispatcher::new(channel.clone(), guide.clone(), registry.clone());
    let dispatcher_task = tokio::spawn(async move { dispatcher.run(events).await });

    let scheduler = SchedulerEngine::new(&config.broadcast, channel, guide, registry);
    let scheduler_task = tokio::spawn(scheduler.run());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
        result = dispatcher_task => {
            tracing::error!("dispatcher task ended: {result:?}");
        }
        result = scheduler_task => {
            tracing::error!("scheduler task ended: {result:?}");
        }
    }
    Ok(())
}

/// Manual one-shot fan-out, for operating the bot by hand.
async fn broadcast_once(config: KinowatchConfig) -> Result<()> {
    let channel = connect(&config).await?;
    let registry = Arc::new(Registry::load(&config.registry_path).await);
    let guide: Arc<dyn ScheduleSource> = Arc::new(HttpGuide::new(config.guide.clone()));

    let engine = SchedulerEngine::new(&config.broadcast, channel, guide, registry);
    let sent = engine.broadcast().await;
    println!("Broadcast attempted for {sent} subscriber(s).");
    Ok(())
}

/// Build the Telegram channel and verify the token. A bad or missing
/// token is fatal here, before any task starts.
async fn connect(config: &KinowatchConfig) -> Result<Arc<TelegramChannel>> {
    let token = config.resolve_token()?;
    let channel = Arc::new(TelegramChannel::new(TelegramConfig::new(token)));

    let me = channel.get_me().await?;
    tracing::info!(
        "authorized as @{} ({})",
        me.username.as_deref().unwrap_or(&me.first_name),
        me.id
    );
    Ok(channel)
}
