//! Ports - 抽象化レイヤー
//!
//! 外部システム（Redis, HTTP, メール送信）へのインターフェースを定義し、
//! 実装の詳細を隠蔽します。実装は `impls` にあります。

pub mod clock;
pub mod id_generator;
pub mod mailer;
pub mod pinger;
pub mod queue_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::mailer::{MailMessage, Mailer};
pub use self::pinger::{PingError, Pinger};
pub use self::queue_store::{QueueStore, StoreError};
