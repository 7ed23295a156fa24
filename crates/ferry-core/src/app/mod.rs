//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてキューの振る舞いを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder / App**: 構築とワイヤリング（composition root）
//! - **Broker**: チャネルごとの publish / consume / requeue / inspect
//! - **Dispatcher**: Command と hook の実行
//! - **Job**: publish 前の fluent builder
//! - **ConsumerGroup**: ポーリングループ

pub mod broker;
pub mod builder;
pub mod consumer;
pub mod dispatcher;
pub mod enqueue;

// 主要な型を再エクスポート
pub use self::broker::{Broker, BrokerError};
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::consumer::{consume_batch, BatchReport, ConsumerGroup, StatsSnapshot};
pub use self::dispatcher::{DispatchError, Dispatcher};
pub use self::enqueue::Job;
