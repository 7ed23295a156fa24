//! Consumer - Broker::consume をポーリングするループ
//!
//! - `ConsumerGroup::spawn(n, ..)` で N 個の consumer を起動
//! - shutdown は watch channel で通知。実行中の command は最後まで走る
//! - `consume_batch` は管理コマンド用に最大 N 件だけ処理する

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::broker::{Broker, BrokerError};
use crate::domain::ErrorKind;

#[derive(Debug, Default)]
pub struct ConsumerStats {
    completed: AtomicU64,
    failed: AtomicU64,
    errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub completed: u64,
    pub failed: u64,
    pub errors: u64,
}

impl ConsumerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Consumer group handle.
/// - `request_shutdown()` で新しいメッセージを取らなくなる
/// - `shutdown_and_join()` で全 consumer の終了を待てる
pub struct ConsumerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
    stats: Arc<ConsumerStats>,
}

impl ConsumerGroup {
    pub fn spawn(n: usize, broker: Arc<Broker>, poll_interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(ConsumerStats::default());

        let mut joins = Vec::with_capacity(n);
        for consumer_id in 0..n {
            let broker = Arc::clone(&broker);
            let stats = Arc::clone(&stats);
            let mut rx = shutdown_rx.clone();

            joins.push(tokio::spawn(async move {
                consumer_loop(consumer_id, broker, poll_interval, stats, &mut rx).await;
            }));
        }

        info!(consumers = n, "consumer group started");
        Self {
            shutdown_tx,
            joins,
            stats,
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// In-flight commands are not cancelled.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) -> StatsSnapshot {
        self.request_shutdown();
        for j in self.joins {
            if let Err(e) = j.await {
                error!(error = %e, "consumer task panicked");
            }
        }
        let stats = self.stats.snapshot();
        info!(
            completed = stats.completed,
            failed = stats.failed,
            errors = stats.errors,
            "consumer group stopped"
        );
        stats
    }
}

async fn consumer_loop(
    consumer_id: usize,
    broker: Arc<Broker>,
    poll_interval: Duration,
    stats: Arc<ConsumerStats>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // consume は shutdown と競合させない（実行途中でキャンセルしない）
        let should_wait = match broker.consume().await {
            Ok(true) => {
                stats.completed.fetch_add(1, Ordering::Relaxed);
                false
            }
            Ok(false) => true,
            Err(e) => {
                log_failure(consumer_id, &e);
                match e.kind() {
                    ErrorKind::CommandFailure | ErrorKind::Permanent => {
                        stats.failed.fetch_add(1, Ordering::Relaxed);
                        false
                    }
                    ErrorKind::Cleanup | ErrorKind::Infrastructure => {
                        stats.errors.fetch_add(1, Ordering::Relaxed);
                        true
                    }
                }
            }
        };

        if should_wait && wait_or_shutdown(shutdown_rx, poll_interval).await {
            break;
        }
    }
    debug!(consumer_id, "consumer stopped");
}

fn log_failure(consumer_id: usize, err: &BrokerError) {
    match err.kind() {
        ErrorKind::CommandFailure => warn!(consumer_id, error = %err, "command failed"),
        _ => error!(consumer_id, error = %err, kind = ?err.kind(), "consume failed"),
    }
}

/// Sleep one poll interval. Returns true when shutdown was requested.
async fn wait_or_shutdown(shutdown_rx: &mut watch::Receiver<bool>, poll_interval: Duration) -> bool {
    tokio::select! {
        changed = shutdown_rx.changed() => changed.is_err() || *shutdown_rx.borrow(),
        _ = tokio::time::sleep(poll_interval) => false,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: u64,
    pub failed: u64,
}

impl BatchReport {
    pub fn attempted(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// Consume up to `max` messages, stopping early when Pending is empty.
///
/// Command failures and unprocessable messages are counted and logged.
/// Store and cleanup errors abort the batch.
pub async fn consume_batch(broker: &Broker, max: u64) -> Result<BatchReport, BrokerError> {
    let mut report = BatchReport::default();
    for _ in 0..max {
        match broker.consume().await {
            Ok(true) => report.succeeded += 1,
            Ok(false) => break,
            Err(e) if matches!(e.kind(), ErrorKind::CommandFailure | ErrorKind::Permanent) => {
                warn!(error = %e, "message failed");
                report.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}
