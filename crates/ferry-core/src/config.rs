//! Settings - キュー / メール / consumer の設定
//!
//! JSON ファイルから読み込み、`FERRY_*` 環境変数で上書きします。
//! すべての項目にデフォルトがあるので、空の `{}` でも動きます。
//!
//! ```json
//! {
//!   "queue": { "base_name": "Ferry:Queue", "redis_host": "localhost", "redis_port": 6379 },
//!   "mail": { "from": "ferry@example.com" },
//!   "consumer": { "workers": 4, "poll_interval_ms": 500 }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::DEFAULT_BASE_NAME;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("reading settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub queue: QueueSettings,
    pub mail: MailSettings,
    pub consumer: ConsumerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub base_name: String,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: i64,
    pub redis_password: Option<String>,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            base_name: DEFAULT_BASE_NAME.to_string(),
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_db: 0,
            redis_password: None,
        }
    }
}

impl QueueSettings {
    /// `redis://[:password@]host:port/db`
    pub fn redis_url(&self) -> String {
        let auth = match self.redis_password.as_deref() {
            Some(password) if !password.is_empty() => format!(":{password}@"),
            _ => String::new(),
        };
        format!(
            "redis://{auth}{}:{}/{}",
            self.redis_host, self.redis_port, self.redis_db
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsumerSettings {
    pub workers: usize,
    pub poll_interval_ms: u64,
    pub ping_timeout_ms: u64,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            workers: 1,
            poll_interval_ms: 500,
            ping_timeout_ms: 5_000,
        }
    }
}

impl ConsumerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}

impl Settings {
    /// Load from a JSON file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut settings = Self::from_json_str(&text)?;
        settings.apply_env_overrides()?;
        Ok(settings)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), SettingsError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), SettingsError> {
        if let Some(v) = lookup("FERRY_QUEUE_BASE_NAME") {
            self.queue.base_name = v;
        }
        if let Some(v) = lookup("FERRY_REDIS_HOST") {
            self.queue.redis_host = v;
        }
        if let Some(v) = lookup("FERRY_REDIS_PORT") {
            self.queue.redis_port = parse_env("FERRY_REDIS_PORT", v)?;
        }
        if let Some(v) = lookup("FERRY_REDIS_DB") {
            self.queue.redis_db = parse_env("FERRY_REDIS_DB", v)?;
        }
        if let Some(v) = lookup("FERRY_REDIS_PASSWORD") {
            self.queue.redis_password = Some(v);
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidEnv { var, value })
}
