//! Dispatcher - Envelope を解決して Command と hook を実行する
//!
//! # 実行順序
//! 1. Registry で Command を解決（失敗 → `Unresolvable`）
//! 2. `ping_before`
//! 3. Command の実行（失敗 → `Failed`）
//! 4. 成功時のみ: `ping_after`、出力ファイルへの書き込み、メール送信
//!
//! 失敗した実行では `ping_after` は送られません。heartbeat として使う場合は
//! 成功の通知としてだけ扱ってください。
//!
//! Command は別タスクで実行します。`run()` の panic は
//! `CommandError::Panicked` になり、通常の失敗と同じ扱いになります。
//!
//! hook の失敗は warn ログに残すだけで、結果には影響しません。
//! リトライはしません（Broker の責務）。

use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::domain::{CommandError, CommandResult, Envelope, Hooks, OutputFile, WriteMode};
use crate::ports::{MailMessage, Mailer, Pinger};
use crate::typed::{CodecError, CommandRegistry, DynCommand};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Unresolvable(#[from] CodecError),

    #[error(transparent)]
    Failed(#[from] CommandError),
}

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    pinger: Arc<dyn Pinger>,
    mailer: Arc<dyn Mailer>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, pinger: Arc<dyn Pinger>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            registry,
            pinger,
            mailer,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub async fn execute(&self, envelope: &Envelope) -> Result<CommandResult, DispatchError> {
        let command = self.registry.resolve(envelope)?;
        let hooks = &envelope.composition.hooks;

        if let Some(url) = &hooks.ping_before {
            self.ping(url).await;
        }

        let result = run_isolated(command).await?;
        if !result.successful {
            return Err(CommandError::Unsuccessful(result.message).into());
        }

        if let Some(url) = &hooks.ping_after {
            self.ping(url).await;
        }
        if hooks.delivers_output() {
            self.deliver_output(envelope, hooks, &result).await;
        }

        Ok(result)
    }

    async fn ping(&self, url: &str) {
        match self.pinger.ping(url).await {
            Ok(()) => debug!(url, "ping sent"),
            Err(e) => warn!(error = %e, "ping hook failed"),
        }
    }

    async fn deliver_output(&self, envelope: &Envelope, hooks: &Hooks, result: &CommandResult) {
        if let Some(output) = result.output.as_deref() {
            for file in &hooks.output_files {
                if let Err(e) = write_output(file, output).await {
                    warn!(path = %file.path.display(), error = %e, "writing command output failed");
                }
            }
        }

        let Some(text) = result.output_text() else {
            return;
        };
        for to in &hooks.email_output_to {
            self.mailer
                .send(MailMessage {
                    to: to.clone(),
                    subject: format!("ferry: output of {}", envelope.command_type),
                    body: text.to_string(),
                })
                .await;
        }
    }
}

async fn run_isolated(command: Box<dyn DynCommand>) -> Result<CommandResult, CommandError> {
    match tokio::spawn(async move { command.run_dyn().await }).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(CommandError::Panicked(panic_message(e.into_panic()))),
        Err(e) => Err(CommandError::new(format!("command task aborted: {e}"))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

async fn write_output(file: &OutputFile, output: &str) -> std::io::Result<()> {
    match file.mode {
        WriteMode::Truncate => tokio::fs::write(&file.path, output).await,
        WriteMode::Append => append(&file.path, output).await,
    }
}

async fn append(path: &Path, output: &str) -> std::io::Result<()> {
    let mut f = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    f.write_all(output.as_bytes()).await?;
    if !output.ends_with('\n') {
        f.write_all(b"\n").await?;
    }
    f.flush().await
}
