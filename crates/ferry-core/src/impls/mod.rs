//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryQueueStore**: 開発用・テスト用のキューストア
//! - **RedisQueueStore**: 本番用（`redis` feature）
//! - **HttpPinger / NoopPinger**: ping hook
//! - **LogMailer**: メール送信の代わりにログへ記録

pub mod http_pinger;
pub mod inmem_store;
pub mod mailer;
#[cfg(feature = "redis")]
pub mod redis_store;

pub use self::http_pinger::{HttpPinger, NoopPinger, DEFAULT_PING_TIMEOUT};
pub use self::inmem_store::InMemoryQueueStore;
pub use self::mailer::LogMailer;
#[cfg(feature = "redis")]
pub use self::redis_store::RedisQueueStore;
