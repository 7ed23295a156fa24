//! InMemoryQueueStore - 開発用・テスト用のキューストア
//!
//! # 実装詳細
//! - HashMap<String, VecDeque<String>> で key ごとに list を管理
//! - tokio の Mutex で排他制御（1 操作 = 1 ロック なのでアトミック）
//! - Redis と同じく、空になった list は key ごと消える
//!
//! head = VecDeque の front、tail = back。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{QueueStore, StoreError};

#[derive(Default, Clone)]
pub struct InMemoryQueueStore {
    lists: Arc<Mutex<HashMap<String, VecDeque<String>>>>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a list, head first (for tests and debugging).
    pub async fn snapshot(&self, key: &str) -> Vec<String> {
        let lists = self.lists.lock().await;
        lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Resolve a Redis-style inclusive index range against `len`.
fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn push_left(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let mut lists = self.lists.lock().await;
        let list = lists.entry(key.to_string()).or_default();
        list.push_front(value.to_string());
        Ok(list.len() as u64)
    }

    async fn pop_right_push_left(&self, src: &str, dst: &str) -> Result<Option<String>, StoreError> {
        let mut lists = self.lists.lock().await;
        let Some(value) = lists.get_mut(src).and_then(VecDeque::pop_back) else {
            return Ok(None);
        };
        if lists.get(src).is_some_and(VecDeque::is_empty) {
            lists.remove(src);
        }
        lists
            .entry(dst.to_string())
            .or_default()
            .push_front(value.clone());
        Ok(Some(value))
    }

    async fn remove(&self, key: &str, value: &str, count: i64) -> Result<u64, StoreError> {
        let mut lists = self.lists.lock().await;
        let Some(list) = lists.get_mut(key) else {
            return Ok(0);
        };

        let limit = if count == 0 { usize::MAX } else { count.unsigned_abs() as usize };
        let mut removed = 0usize;
        if count >= 0 {
            let mut i = 0;
            while i < list.len() && removed < limit {
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        } else {
            let mut i = list.len();
            while i > 0 && removed < limit {
                i -= 1;
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                }
            }
        }

        if list.is_empty() {
            lists.remove(key);
        }
        Ok(removed as u64)
    }

    async fn length(&self, key: &str) -> Result<u64, StoreError> {
        let lists = self.lists.lock().await;
        Ok(lists.get(key).map_or(0, |list| list.len() as u64))
    }

    async fn delete_key(&self, key: &str) -> Result<bool, StoreError> {
        let mut lists = self.lists.lock().await;
        Ok(lists.remove(key).is_some())
    }

    async fn range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        let lists = self.lists.lock().await;
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        Ok(match resolve_range(list.len(), start, stop) {
            Some((from, to)) => list.range(from..=to).cloned().collect(),
            None => Vec::new(),
        })
    }
}
