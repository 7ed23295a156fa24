//! Plugin - CLI から使える Command 型の静的テーブル
//!
//! plugin は自分の Command 型を registry に登録し、CLI 用に
//! 「名前 → JSON 引数から Command を作る関数」の一覧を公開します。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use ferry_core::typed::{CommandRegistry, DynCommand, RegistryError};
use ferry_core::{Command, CommandError, CommandResult};

pub struct Plugin {
    pub name: &'static str,
    pub register: fn(&mut CommandRegistry) -> Result<(), RegistryError>,
    pub commands: &'static [PluginCommand],
}

pub struct PluginCommand {
    pub name: &'static str,
    pub about: &'static str,
    pub build: fn(Value) -> Result<Box<dyn DynCommand>, serde_json::Error>,
}

impl Plugin {
    pub fn command(&self, name: &str) -> Option<&PluginCommand> {
        self.commands.iter().find(|c| c.name == name)
    }
}

fn build<T: Command>(args: Value) -> Result<Box<dyn DynCommand>, serde_json::Error> {
    Ok(Box::new(serde_json::from_value::<T>(args)?))
}

pub static PLUGINS: &[Plugin] = &[SAMPLE];

pub fn find(name: &str) -> Option<&'static Plugin> {
    PLUGINS.iter().find(|p| p.name == name)
}

// ========================================
// sample plugin
// ========================================

const SAMPLE: Plugin = Plugin {
    name: "sample",
    register: register_sample,
    commands: &[
        PluginCommand {
            name: "echo",
            about: r#"print the given text, args: {"verbatim_text": "..."}"#,
            build: build::<Echo>,
        },
        PluginCommand {
            name: "always-fail",
            about: "fail with 'boom'",
            build: build::<AlwaysFail>,
        },
        PluginCommand {
            name: "always-succeed",
            about: "succeed without output",
            build: build::<AlwaysSucceed>,
        },
    ],
};

fn register_sample(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register::<Echo>()?;
    registry.register::<AlwaysFail>()?;
    registry.register::<AlwaysSucceed>()?;
    registry.register_lambda("hello", || async {
        info!("hello from a lambda");
        Ok(())
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Echo {
    pub verbatim_text: String,
}

#[async_trait]
impl Command for Echo {
    const TYPE: &'static str = "sample.echo";
    const MODULE: &'static str = "ferry-sample";

    async fn run(&self) -> Result<CommandResult, CommandError> {
        println!("{}", self.verbatim_text);
        Ok(CommandResult::success().with_output(&self.verbatim_text))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlwaysFail;

#[async_trait]
impl Command for AlwaysFail {
    const TYPE: &'static str = "sample.always_fail";
    const MODULE: &'static str = "ferry-sample";

    async fn run(&self) -> Result<CommandResult, CommandError> {
        Err(CommandError::new("boom"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlwaysSucceed;

#[async_trait]
impl Command for AlwaysSucceed {
    const TYPE: &'static str = "sample.always_succeed";
    const MODULE: &'static str = "ferry-sample";

    async fn run(&self) -> Result<CommandResult, CommandError> {
        Ok(CommandResult::success_with("succeeded"))
    }
}
