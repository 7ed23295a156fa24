mod cli;
mod commands;
mod plugin;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use ferry_core::AppBuilder;
use ferry_core::config::Settings;
use ferry_core::impls::{HttpPinger, InMemoryQueueStore, LogMailer};
use ferry_core::observability::init_tracing;
use ferry_core::ports::QueueStore;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let settings = load_settings(&cli)?;
    let plugin = plugin::find(&cli.plugin)
        .with_context(|| format!("unknown plugin '{}'", cli.plugin))?;
    let store = connect_store(&cli, &settings).await?;

    let app = AppBuilder::new()
        .configure(plugin.register)?
        .with_store(store)
        .with_base_name(&settings.queue.base_name)
        .with_pinger(Arc::new(HttpPinger::new(settings.consumer.ping_timeout())?))
        .with_mailer(Arc::new(LogMailer::from_settings(&settings.mail)))
        .build()?;
    let broker = if cli.secondary {
        app.secondary_broker()
    } else {
        app.primary_broker()
    };

    match cli.command {
        Commands::Length => commands::length(&app).await,
        Commands::Peek { queue, start, stop } => {
            commands::peek(&broker, queue.into(), start, stop).await
        }
        Commands::Consume { count } => commands::consume(&broker, count).await,
        Commands::Work { workers } => {
            let workers = workers.unwrap_or(settings.consumer.workers).max(1);
            commands::work(broker, workers, &settings).await
        }
        Commands::RepublishFailed { all } => commands::republish_failed(&broker, all).await,
        Commands::Clear { queue } => commands::clear(&broker, queue).await,
        Commands::Enqueue(args) => commands::enqueue(&broker, plugin, args).await,
        Commands::Run(args) => commands::run(&app, &broker, plugin, args).await,
        Commands::List => {
            commands::list(&app, plugin);
            Ok(())
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display())),
        None => {
            let mut settings = Settings::default();
            settings.apply_env_overrides()?;
            Ok(settings)
        }
    }
}

#[cfg(feature = "redis")]
async fn connect_store(cli: &Cli, settings: &Settings) -> Result<Arc<dyn QueueStore>> {
    if cli.in_memory {
        return Ok(Arc::new(InMemoryQueueStore::new()));
    }
    let store = ferry_core::impls::RedisQueueStore::connect(&settings.queue)
        .await
        .context("connecting to redis")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn connect_store(cli: &Cli, _settings: &Settings) -> Result<Arc<dyn QueueStore>> {
    if !cli.in_memory {
        tracing::warn!("built without the redis feature, queues live in process memory");
    }
    Ok(Arc::new(InMemoryQueueStore::new()))
}
