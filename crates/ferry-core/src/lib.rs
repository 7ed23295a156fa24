//! ferry-core
//!
//! Core building blocks for the Ferry job queue.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, channel, envelope, hooks, outcome, errors）
//! - **ports**: 抽象化レイヤー（QueueStore, Pinger, Mailer, Clock, IdGenerator）
//! - **typed**: 型付き Command API（Command trait, CommandRegistry, EnvelopeCodec）
//! - **app**: アプリケーションロジック（AppBuilder, Broker, Dispatcher, Job, ConsumerGroup）
//! - **impls**: 実装（InMemoryQueueStore, RedisQueueStore, HttpPinger, LogMailer）
//! - **config**: Settings の読み込み
//! - **observability**: tracing 初期化とキュー集計

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod typed;

#[cfg(test)]
mod testing;

pub use self::app::{App, AppBuilder, Broker, BrokerError, Job};
pub use self::domain::{CommandError, CommandResult};
pub use self::typed::Command;
