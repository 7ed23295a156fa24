//! QueueStore port - 永続 list ストア（Redis または InMemory）
//!
//! Broker はキューの状態を一切持たず、すべてここに委譲します。
//!
//! # 設計原則
//! - 全操作はストア側でアトミック（core 側でロックしない）
//! - `pop_right_push_left` が唯一の並行安全プリミティブ
//!   （競合する consumer は必ず別の値か空を受け取る）
//! - 値はシリアライズ済みの envelope 文字列（バイト一致で remove する）

use async_trait::async_trait;

/// Errors surfaced by a queue store. Broker operations propagate these as-is.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("queue store unavailable: {0}")]
    Unavailable(String),

    #[error("queue store command failed: {0}")]
    Command(String),
}

/// Durable list store addressed by string keys.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Insert at the head. Returns the new list length.
    async fn push_left(&self, key: &str, value: &str) -> Result<u64, StoreError>;

    /// Atomically pop the tail of `src` and push it onto the head of `dst`.
    async fn pop_right_push_left(&self, src: &str, dst: &str) -> Result<Option<String>, StoreError>;

    /// Delete matching values: `count > 0` from the head, `count < 0` from
    /// the tail, `count == 0` all of them. Returns the number removed.
    async fn remove(&self, key: &str, value: &str, count: i64) -> Result<u64, StoreError>;

    async fn length(&self, key: &str) -> Result<u64, StoreError>;

    /// Returns whether the key existed.
    async fn delete_key(&self, key: &str) -> Result<bool, StoreError>;

    /// Inclusive range, negative indexes count from the tail.
    async fn range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError>;
}
