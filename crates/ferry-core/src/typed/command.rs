//! Command trait - キューで運ぶ処理単位の定義
//!
//! # 二層構造
//! - **表層（Typed）**: `Command` trait - 型ごとに `TYPE` / `MODULE` を持つ
//! - **内部（Dyn）**: `DynCommand` trait - object-safe, type erasure
//!
//! `Command` を実装した型はすべて blanket impl で `DynCommand` になるので、
//! Job や Registry は `Box<dyn DynCommand>` だけを扱います。

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{CommandError, CommandResult, CommandType};

/// Command は型識別子（名前 + モジュール）と実行内容を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Echo {
///     verbatim_text: String,
/// }
///
/// #[async_trait]
/// impl Command for Echo {
///     const TYPE: &'static str = "sample.echo";
///     const MODULE: &'static str = "ferry-sample";
///
///     async fn run(&self) -> Result<CommandResult, CommandError> {
///         Ok(CommandResult::success().with_output(&self.verbatim_text))
///     }
/// }
/// ```
///
/// # Trait Bounds
/// - `Serialize` / `DeserializeOwned`: プロセス境界を JSON で越えるため
/// - `Send + Sync + 'static`: consumer タスク間で共有するため
#[async_trait]
pub trait Command: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 型名（`{namespace}.{name}`）
    const TYPE: &'static str;

    /// 型を提供するモジュール（plugin 名）
    const MODULE: &'static str;

    async fn run(&self) -> Result<CommandResult, CommandError>;
}

pub fn command_type_of<T: Command>() -> CommandType {
    CommandType::new(T::TYPE, T::MODULE)
}

/// DynCommand は object-safe な Command の抽象化
#[async_trait]
pub trait DynCommand: Send + Sync {
    fn command_type(&self) -> CommandType;

    /// JSON payload（Envelope の `serialized_command`）
    fn serialize_payload(&self) -> Result<String, serde_json::Error>;

    async fn run_dyn(&self) -> Result<CommandResult, CommandError>;
}

#[async_trait]
impl<T: Command> DynCommand for T {
    fn command_type(&self) -> CommandType {
        command_type_of::<T>()
    }

    fn serialize_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    async fn run_dyn(&self) -> Result<CommandResult, CommandError> {
        self.run().await
    }
}

/// 名前で参照される lambda
///
/// クロージャはプロセス境界を越えられないので、Envelope には名前だけを載せ、
/// consumer 側の `CommandRegistry::register_lambda` で登録された
/// クロージャに解決します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaCommand {
    pub name: String,
}

impl LambdaCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Command for LambdaCommand {
    const TYPE: &'static str = "ferry.lambda";
    const MODULE: &'static str = "ferry-core";

    /// Registry を経由せずに実行された場合（= 未解決）は失敗
    async fn run(&self) -> Result<CommandResult, CommandError> {
        Err(CommandError::new(format!(
            "lambda '{}' is not bound to a closure",
            self.name
        )))
    }
}
