//! テスト用の Command と port 実装

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{App, AppBuilder};
use crate::domain::{CommandError, CommandResult};
use crate::impls::InMemoryQueueStore;
use crate::ports::{FixedClock, MailMessage, Mailer, PingError, Pinger, QueueStore, StoreError, UlidGenerator};
use crate::typed::{Command, EnvelopeCodec};

// ========================================
// Commands
// ========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub verbatim_text: String,
}

impl Echo {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            verbatim_text: text.into(),
        }
    }
}

#[async_trait]
impl Command for Echo {
    const TYPE: &'static str = "sample.echo";
    const MODULE: &'static str = "ferry-sample";

    async fn run(&self) -> Result<CommandResult, CommandError> {
        Ok(CommandResult::success().with_output(&self.verbatim_text))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlwaysFail;

#[async_trait]
impl Command for AlwaysFail {
    const TYPE: &'static str = "sample.always_fail";
    const MODULE: &'static str = "ferry-sample";

    async fn run(&self) -> Result<CommandResult, CommandError> {
        Err(CommandError::new("boom"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlwaysSucceed;

#[async_trait]
impl Command for AlwaysSucceed {
    const TYPE: &'static str = "sample.always_succeed";
    const MODULE: &'static str = "ferry-sample";

    async fn run(&self) -> Result<CommandResult, CommandError> {
        Ok(CommandResult::success_with("succeeded"))
    }
}

/// Returns a result with `successful == false` instead of an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsFailure;

#[async_trait]
impl Command for ReportsFailure {
    const TYPE: &'static str = "sample.reports_failure";
    const MODULE: &'static str = "ferry-sample";

    async fn run(&self) -> Result<CommandResult, CommandError> {
        Ok(CommandResult::failure("nothing to do"))
    }
}

/// Panics inside `run()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panics;

#[async_trait]
impl Command for Panics {
    const TYPE: &'static str = "sample.panics";
    const MODULE: &'static str = "ferry-sample";

    async fn run(&self) -> Result<CommandResult, CommandError> {
        let empty: Vec<u32> = Vec::new();
        let index = empty.len() + 3;
        Ok(CommandResult::success_with(empty[index].to_string()))
    }
}

// ========================================
// Ports
// ========================================

#[derive(Default)]
pub struct RecordingPinger {
    urls: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingPinger {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Pinger for RecordingPinger {
    async fn ping(&self, url: &str) -> Result<(), PingError> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(PingError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) {
        self.sent.lock().unwrap().push(message);
    }
}

/// InMemoryQueueStore whose `remove` can be switched to fail.
#[derive(Default, Clone)]
pub struct FlakyStore {
    pub inner: InMemoryQueueStore,
    fail_remove: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn fail_removes(&self) {
        self.fail_remove.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueueStore for FlakyStore {
    async fn push_left(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        self.inner.push_left(key, value).await
    }

    async fn pop_right_push_left(&self, src: &str, dst: &str) -> Result<Option<String>, StoreError> {
        self.inner.pop_right_push_left(src, dst).await
    }

    async fn remove(&self, key: &str, value: &str, count: i64) -> Result<u64, StoreError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.remove(key, value, count).await
    }

    async fn length(&self, key: &str) -> Result<u64, StoreError> {
        self.inner.length(key).await
    }

    async fn delete_key(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete_key(key).await
    }

    async fn range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        self.inner.range(key, start, stop).await
    }
}

/// InMemoryQueueStore that records every message it hands out from
/// `pop_right_push_left`.
#[derive(Default, Clone)]
pub struct RecordingStore {
    pub inner: InMemoryQueueStore,
    taken: Arc<Mutex<Vec<String>>>,
}

impl RecordingStore {
    pub fn over(inner: InMemoryQueueStore) -> Self {
        Self {
            inner,
            taken: Arc::default(),
        }
    }

    pub fn taken(&self) -> Vec<String> {
        self.taken.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueStore for RecordingStore {
    async fn push_left(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        self.inner.push_left(key, value).await
    }

    async fn pop_right_push_left(&self, src: &str, dst: &str) -> Result<Option<String>, StoreError> {
        let value = self.inner.pop_right_push_left(src, dst).await?;
        if let Some(v) = &value {
            self.taken.lock().unwrap().push(v.clone());
        }
        Ok(value)
    }

    async fn remove(&self, key: &str, value: &str, count: i64) -> Result<u64, StoreError> {
        self.inner.remove(key, value, count).await
    }

    async fn length(&self, key: &str) -> Result<u64, StoreError> {
        self.inner.length(key).await
    }

    async fn delete_key(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete_key(key).await
    }

    async fn range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        self.inner.range(key, start, stop).await
    }
}

// ========================================
// Wiring
// ========================================

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn test_codec() -> EnvelopeCodec {
    let clock = Arc::new(FixedClock::new(fixed_time()));
    EnvelopeCodec::new(Arc::new(UlidGenerator::new(clock.clone())), clock)
}

pub struct TestApp {
    pub app: App,
    pub pinger: Arc<RecordingPinger>,
    pub mailer: Arc<RecordingMailer>,
}

/// App over `store` with the sample commands registered and recording hooks.
pub fn test_app(store: Arc<dyn QueueStore>) -> TestApp {
    let pinger = Arc::new(RecordingPinger::default());
    let mailer = Arc::new(RecordingMailer::default());
    let app = AppBuilder::new()
        .register::<Echo>()
        .unwrap()
        .register::<AlwaysFail>()
        .unwrap()
        .register::<AlwaysSucceed>()
        .unwrap()
        .register::<ReportsFailure>()
        .unwrap()
        .register::<Panics>()
        .unwrap()
        .with_store(store)
        .with_pinger(pinger.clone())
        .with_mailer(mailer.clone())
        .with_base_name("Test:Queue")
        .build()
        .unwrap();
    TestApp { app, pinger, mailer }
}
