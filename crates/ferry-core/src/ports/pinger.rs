//! Pinger port - ping_before / ping_after hook 用の HTTP GET
//!
//! 結果は dispatcher 側でログに残すだけで、ジョブの成否には影響しません。

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum PingError {
    #[error("ping to {url} failed: {reason}")]
    Failed { url: String, reason: String },

    #[error("ping to {url} returned status {status}")]
    Status { url: String, status: u16 },
}

#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self, url: &str) -> Result<(), PingError>;
}
