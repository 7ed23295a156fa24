//! AppBuilder - composition root
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 接続などの共有リソースは App が所有し、Broker に Arc で配る

use std::future::Future;
use std::sync::Arc;

use crate::domain::{Channel, CommandError, CommandType, DEFAULT_BASE_NAME, PRIMARY_CHANNEL, SECONDARY_CHANNEL};
use crate::impls::{HttpPinger, LogMailer, DEFAULT_PING_TIMEOUT};
use crate::ports::{Clock, Mailer, PingError, Pinger, QueueStore, SystemClock, UlidGenerator};
use crate::typed::{Command, CommandRegistry, EnvelopeCodec, RegistryError};

use super::broker::Broker;
use super::dispatcher::Dispatcher;

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .register::<Echo>()?
///     .expect_commands(&[command_type_of::<Echo>()])
///     .with_store(Arc::new(InMemoryQueueStore::new()))
///     .build()?;
///
/// app.primary_broker().publish(&Echo::new("hi")).await?;
/// ```
///
/// # Fail-fast 設計
/// - expect_commands() で期待される型を登録
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - store が無ければ BuildError
pub struct AppBuilder {
    registry: CommandRegistry,
    expected_commands: Option<Vec<CommandType>>,
    store: Option<Arc<dyn QueueStore>>,
    pinger: Option<Arc<dyn Pinger>>,
    mailer: Option<Arc<dyn Mailer>>,
    clock: Arc<dyn Clock>,
    base_name: String,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing command types: {0:?}. These commands were expected but not registered.")]
    MissingCommandTypes(Vec<String>),

    #[error("no queue store configured")]
    MissingStore,

    #[error("creating default pinger: {0}")]
    Pinger(#[from] PingError),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: CommandRegistry::new(),
            expected_commands: None,
            store: None,
            pinger: None,
            mailer: None,
            clock: Arc::new(SystemClock),
            base_name: DEFAULT_BASE_NAME.to_string(),
        }
    }

    /// Command 型を登録
    pub fn register<T: Command>(mut self) -> Result<Self, RegistryError> {
        self.registry.register::<T>()?;
        Ok(self)
    }

    pub fn register_lambda<F, Fut>(mut self, name: impl Into<String>, f: F) -> Result<Self, RegistryError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
    {
        self.registry.register_lambda(name, f)?;
        Ok(self)
    }

    /// plugin など、登録処理をまとめて適用する
    pub fn configure(
        mut self,
        f: impl FnOnce(&mut CommandRegistry) -> Result<(), RegistryError>,
    ) -> Result<Self, RegistryError> {
        f(&mut self.registry)?;
        Ok(self)
    }

    pub fn expect_commands(mut self, command_types: &[CommandType]) -> Self {
        self.expected_commands = Some(command_types.to_vec());
        self
    }

    pub fn with_store(mut self, store: Arc<dyn QueueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_pinger(mut self, pinger: Arc<dyn Pinger>) -> Self {
        self.pinger = Some(pinger);
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    /// # 検証
    /// - expect_commands() の型が全て登録されているか
    /// - store が設定されているか
    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected) = &self.expected_commands {
            let missing: Vec<String> = expected
                .iter()
                .filter(|t| !self.registry.contains(t))
                .map(ToString::to_string)
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingCommandTypes(missing));
            }
        }

        let store = self.store.ok_or(BuildError::MissingStore)?;
        let pinger: Arc<dyn Pinger> = match self.pinger {
            Some(pinger) => pinger,
            None => Arc::new(HttpPinger::new(DEFAULT_PING_TIMEOUT)?),
        };
        let mailer = self
            .mailer
            .unwrap_or_else(|| Arc::new(LogMailer::new()) as Arc<dyn Mailer>);

        let ids = Arc::new(UlidGenerator::new(self.clock.clone()));
        Ok(App {
            store,
            base_name: self.base_name,
            codec: EnvelopeCodec::new(ids, self.clock),
            dispatcher: Arc::new(Dispatcher::new(Arc::new(self.registry), pinger, mailer)),
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App は共有リソース（store 接続・registry・codec）を所有し、
/// チャネルごとの Broker を払い出す
pub struct App {
    store: Arc<dyn QueueStore>,
    base_name: String,
    codec: EnvelopeCodec,
    dispatcher: Arc<Dispatcher>,
}

impl App {
    pub fn broker(&self, channel_name: &str) -> Broker {
        Broker::new(
            self.store.clone(),
            Channel::new(&self.base_name, channel_name),
            self.codec.clone(),
            self.dispatcher.clone(),
        )
    }

    pub fn primary_broker(&self) -> Broker {
        self.broker(PRIMARY_CHANNEL)
    }

    pub fn secondary_broker(&self) -> Broker {
        self.broker(SECONDARY_CHANNEL)
    }

    pub fn registry(&self) -> &CommandRegistry {
        self.dispatcher.registry()
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryQueueStore, NoopPinger};
    use crate::typed::command_type_of;
    use crate::testing::{AlwaysFail, Echo};

    fn builder() -> AppBuilder {
        AppBuilder::new()
            .with_store(Arc::new(InMemoryQueueStore::new()))
            .with_pinger(Arc::new(NoopPinger))
    }

    #[test]
    fn build_success() {
        let app = builder()
            .register::<Echo>()
            .unwrap()
            .expect_commands(&[command_type_of::<Echo>()])
            .build();
        assert!(app.is_ok());
    }

    #[test]
    fn build_missing_command_types() {
        let app = builder()
            .register::<Echo>()
            .unwrap()
            .expect_commands(&[command_type_of::<Echo>(), command_type_of::<AlwaysFail>()])
            .build();
        assert!(matches!(
            app,
            Err(BuildError::MissingCommandTypes(missing))
                if missing == vec!["sample.always_fail, ferry-sample".to_string()]
        ));
    }

    #[test]
    fn build_without_store_fails() {
        let app = AppBuilder::new().with_pinger(Arc::new(NoopPinger)).build();
        assert!(matches!(app, Err(BuildError::MissingStore)));
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let result = builder().register::<Echo>().unwrap().register::<Echo>();
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[test]
    fn brokers_share_base_name() {
        let app = builder().with_base_name("Test:Queue").build().unwrap();
        assert_eq!(app.primary_broker().channel().to_string(), "Test:Queue:Primary");
        assert_eq!(app.secondary_broker().channel().name(), "Secondary");
        assert_eq!(app.broker("Reports").channel().base_name(), "Test:Queue");
    }

    #[test]
    fn configure_applies_plugin_registrations() {
        let app = builder()
            .configure(|registry| {
                registry.register::<Echo>()?;
                registry.register_lambda("noop", || async { Ok(()) })
            })
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(app.registry().registered_types().len(), 1);
        assert_eq!(app.registry().registered_lambdas(), vec!["noop"]);
    }
}
