//! HttpPinger - reqwest で GET するだけの Pinger 実装

use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{PingError, Pinger};

pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct HttpPinger {
    client: reqwest::Client,
}

impl HttpPinger {
    pub fn new(timeout: Duration) -> Result<Self, PingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PingError::Failed {
                url: String::new(),
                reason: format!("building http client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Pinger for HttpPinger {
    async fn ping(&self, url: &str) -> Result<(), PingError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PingError::Failed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PingError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Pinger that does nothing (hooks configured but pings disabled).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPinger;

#[async_trait]
impl Pinger for NoopPinger {
    async fn ping(&self, _url: &str) -> Result<(), PingError> {
        Ok(())
    }
}
