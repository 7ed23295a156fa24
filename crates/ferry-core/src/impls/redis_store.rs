//! RedisQueueStore - 本番用のキューストア（`redis` feature）
//!
//! `ConnectionManager` は多重化された 1 本の接続で、clone して並行に使えます。
//! App（composition root）が 1 つだけ作り、全 Broker で共有します。
//!
//! | QueueStore            | Redis       |
//! |-----------------------|-------------|
//! | push_left             | LPUSH       |
//! | pop_right_push_left   | RPOPLPUSH   |
//! | remove                | LREM        |
//! | length                | LLEN        |
//! | delete_key            | DEL         |
//! | range                 | LRANGE      |

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

use crate::config::QueueSettings;
use crate::ports::{QueueStore, StoreError};

#[derive(Clone)]
pub struct RedisQueueStore {
    conn: ConnectionManager,
}

impl RedisQueueStore {
    /// Connect using the queue settings (host, port, db, password).
    pub async fn connect(settings: &QueueSettings) -> Result<Self, StoreError> {
        Self::connect_url(&settings.redis_url()).await
    }

    pub async fn connect_url(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        info!(redis = %redact(url), "connected to queue store");
        Ok(Self { conn })
    }
}

fn map_redis_error(err: redis::RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
    {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Command(err.to_string())
    }
}

/// Hide the password part of a redis URL for logging.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn push_left(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        conn.lpush(key, value).await.map_err(map_redis_error)
    }

    async fn pop_right_push_left(&self, src: &str, dst: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.rpoplpush(src, dst).await.map_err(map_redis_error)
    }

    async fn remove(&self, key: &str, value: &str, count: i64) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        conn.lrem(key, count as isize, value)
            .await
            .map_err(map_redis_error)
    }

    async fn length(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        conn.llen(key).await.map_err(map_redis_error)
    }

    async fn delete_key(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: u64 = conn.del(key).await.map_err(map_redis_error)?;
        Ok(deleted > 0)
    }

    async fn range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.lrange(key, start as isize, stop as isize)
            .await
            .map_err(map_redis_error)
    }
}
