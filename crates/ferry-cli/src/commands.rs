//! サブコマンドの実装

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::info;

use ferry_core::app::{consume_batch, App, Broker, ConsumerGroup, Job};
use ferry_core::config::Settings;
use ferry_core::domain::{Composition, QueueKind};
use ferry_core::typed::{DynCommand, LambdaCommand};

use crate::cli::{ClearTarget, CommandArgs, EnqueueArgs};
use crate::plugin::Plugin;

pub async fn length(app: &App) -> Result<()> {
    for broker in [app.primary_broker(), app.secondary_broker()] {
        let counts = broker.counts().await?;
        println!("{}", broker.channel());
        println!("  pending:     {}", counts.pending);
        println!("  in progress: {}", counts.in_progress);
        println!("  failed:      {}", counts.failed);
    }
    Ok(())
}

pub async fn peek(broker: &Broker, kind: QueueKind, start: i64, stop: i64) -> Result<()> {
    let messages = broker.peek(kind, start, stop).await?;
    if messages.is_empty() {
        println!("{} is empty", broker.channel().key(kind));
        return Ok(());
    }
    for message in messages {
        match broker.codec().decode(&message) {
            Ok(envelope) => println!("{}", serde_json::to_string_pretty(&envelope)?),
            Err(e) => println!("{message}  <- {e}"),
        }
    }
    Ok(())
}

pub async fn consume(broker: &Broker, count: u64) -> Result<()> {
    let report = consume_batch(broker, count).await?;
    println!(
        "consumed {} message(s): {} succeeded, {} failed",
        report.attempted(),
        report.succeeded,
        report.failed
    );
    Ok(())
}

pub async fn work(broker: Broker, workers: usize, settings: &Settings) -> Result<()> {
    let group = ConsumerGroup::spawn(workers, Arc::new(broker), settings.consumer.poll_interval());
    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    info!("shutting down, waiting for in-flight commands");
    let stats = group.shutdown_and_join().await;
    println!(
        "completed={} failed={} errors={}",
        stats.completed, stats.failed, stats.errors
    );
    Ok(())
}

pub async fn republish_failed(broker: &Broker, all: bool) -> Result<()> {
    if all {
        let n = broker.republish_all_failed_messages().await?;
        println!("republished {n} message(s)");
    } else if broker.republish_failed_messages().await? {
        println!("republished 1 message");
    } else {
        println!("no failed messages");
    }
    Ok(())
}

pub async fn clear(broker: &Broker, target: ClearTarget) -> Result<()> {
    let kinds: &[QueueKind] = match target {
        ClearTarget::Pending => &[QueueKind::Pending],
        ClearTarget::InProgress => &[QueueKind::InProgress],
        ClearTarget::Failed => &[QueueKind::Failed],
        ClearTarget::All => &QueueKind::ALL,
    };
    for &kind in kinds {
        let deleted = match kind {
            QueueKind::Pending => broker.clear_pending_queue().await?,
            QueueKind::InProgress => broker.clear_in_progress_queue().await?,
            QueueKind::Failed => broker.clear_failed_queue().await?,
        };
        println!(
            "{}: {}",
            broker.channel().key(kind),
            if deleted { "cleared" } else { "already empty" }
        );
    }
    Ok(())
}

pub async fn enqueue(broker: &Broker, plugin: &Plugin, args: EnqueueArgs) -> Result<()> {
    let command = build_command(plugin, &args.command)?;

    let mut job = Job::boxed(command).with_retries(args.retries);
    if let Some(url) = args.ping_before {
        job = job.ping_before(url);
    }
    if let Some(url) = args.ping_after {
        job = job.ping_after(url);
    }
    if let Some(path) = args.write_output_to {
        job = job.write_output_to(path);
    }
    if let Some(path) = args.append_output_to {
        job = job.append_output_to(path);
    }
    for to in args.email_output_to {
        job = job.email_output_to(to);
    }

    for id in job.dispatch(broker).await? {
        println!("{id}");
    }
    Ok(())
}

pub async fn run(app: &App, broker: &Broker, plugin: &Plugin, args: CommandArgs) -> Result<()> {
    let command = build_command(plugin, &args)?;
    let envelope = broker.codec().envelope(command.as_ref(), Composition::default())?;
    let resolved = app.registry().resolve(&envelope)?;

    let result = resolved.run_dyn().await?;
    println!("successful: {}", result.successful);
    if !result.message.is_empty() {
        println!("message: {}", result.message);
    }
    if let Some(output) = result.output {
        println!("output:\n{output}");
    }
    Ok(())
}

pub fn list(app: &App, plugin: &Plugin) {
    println!("plugin: {}", plugin.name);
    for c in plugin.commands {
        println!("  {:<16} {}", c.name, c.about);
    }
    for name in app.registry().registered_lambdas() {
        println!("  --lambda {name}");
    }
}

fn build_command(plugin: &Plugin, args: &CommandArgs) -> Result<Box<dyn DynCommand>> {
    if let Some(name) = &args.lambda {
        return Ok(Box::new(LambdaCommand::new(name.clone())));
    }
    let Some(name) = args.name.as_deref() else {
        bail!("either a command name or --lambda is required");
    };
    let entry = plugin
        .command(name)
        .with_context(|| format!("plugin '{}' has no command '{name}'", plugin.name))?;

    let json: Value = match args.args.as_deref() {
        Some(text) => serde_json::from_str(text).context("--args is not valid JSON")?,
        None => Value::Null,
    };
    (entry.build)(json).with_context(|| format!("invalid arguments for '{name}'"))
}
