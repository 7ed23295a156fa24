//! CommandRegistry - Command 型と lambda の登録と解決
//!
//! # 学習ポイント
//! - HashMap での型消去された factory の管理
//! - Generic methods での登録と型安全性
//! - 名前付きクロージャ（lambda）の保持
//!
//! 起動時に consumer プロセスが使う型をすべて登録します。
//! 登録されていない型の Envelope は `UnresolvableType` になります。

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use super::codec::CodecError;
use super::command::{command_type_of, Command, DynCommand, LambdaCommand};
use crate::domain::{CommandError, CommandResult, CommandType, Envelope};

type Factory = Arc<dyn Fn(&str) -> Result<Box<dyn DynCommand>, serde_json::Error> + Send + Sync>;

type LambdaFuture = Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send>>;

pub type LambdaFn = Arc<dyn Fn() -> LambdaFuture + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("command type '{0}' is already registered")]
    AlreadyRegistered(CommandType),

    #[error("lambda '{0}' is already registered")]
    LambdaAlreadyRegistered(String),
}

#[derive(Default, Clone)]
pub struct CommandRegistry {
    factories: HashMap<CommandType, Factory>,
    lambdas: HashMap<String, LambdaFn>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Command>(&mut self) -> Result<(), RegistryError> {
        let command_type = command_type_of::<T>();
        if self.factories.contains_key(&command_type) {
            return Err(RegistryError::AlreadyRegistered(command_type));
        }
        let factory: Factory = Arc::new(|payload: &str| -> Result<Box<dyn DynCommand>, serde_json::Error> {
            let command: T = serde_json::from_str(payload)?;
            Ok(Box::new(command) as Box<dyn DynCommand>)
        });
        self.factories.insert(command_type, factory);
        Ok(())
    }

    /// Register a closure that `Job::lambda(name)` envelopes resolve to.
    pub fn register_lambda<F, Fut>(&mut self, name: impl Into<String>, f: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
    {
        let name = name.into();
        if self.lambdas.contains_key(&name) {
            return Err(RegistryError::LambdaAlreadyRegistered(name));
        }
        let f: LambdaFn = Arc::new(move || Box::pin(f()) as LambdaFuture);
        self.lambdas.insert(name, f);
        Ok(())
    }

    pub fn contains(&self, command_type: &CommandType) -> bool {
        self.factories.contains_key(command_type)
    }

    pub fn registered_types(&self) -> Vec<CommandType> {
        let mut types: Vec<_> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn registered_lambdas(&self) -> Vec<String> {
        let mut names: Vec<_> = self.lambdas.keys().cloned().collect();
        names.sort();
        names
    }

    /// Envelope から実行可能な Command を復元する
    pub fn resolve(&self, envelope: &Envelope) -> Result<Box<dyn DynCommand>, CodecError> {
        let command_type = envelope.command_type();
        let unresolvable = |reason: String| CodecError::UnresolvableType {
            command_type: command_type.to_string(),
            reason,
        };

        if command_type == command_type_of::<LambdaCommand>() {
            let lambda: LambdaCommand = serde_json::from_str(&envelope.serialized_command)
                .map_err(|e| unresolvable(format!("payload: {e}")))?;
            let f = self
                .lambdas
                .get(&lambda.name)
                .cloned()
                .ok_or_else(|| unresolvable(format!("no lambda named '{}'", lambda.name)))?;
            return Ok(Box::new(BoundLambda { lambda, f }));
        }

        let factory = self
            .factories
            .get(&command_type)
            .ok_or_else(|| unresolvable("type is not registered".to_string()))?;
        factory(&envelope.serialized_command).map_err(|e| unresolvable(format!("payload: {e}")))
    }
}

/// LambdaCommand と登録済みクロージャの組
struct BoundLambda {
    lambda: LambdaCommand,
    f: LambdaFn,
}

#[async_trait]
impl DynCommand for BoundLambda {
    fn command_type(&self) -> CommandType {
        command_type_of::<LambdaCommand>()
    }

    fn serialize_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.lambda)
    }

    async fn run_dyn(&self) -> Result<CommandResult, CommandError> {
        (self.f)().await?;
        Ok(CommandResult::success_with(format!("lambda '{}' completed", self.lambda.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnvelopeId;
    use crate::testing::{AlwaysFail, Echo};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ulid::Ulid;

    fn envelope_for(command: &dyn DynCommand) -> Envelope {
        Envelope::new(
            EnvelopeId::from_ulid(Ulid::new()),
            &command.command_type(),
            command.serialize_payload().unwrap(),
        )
    }

    #[tokio::test]
    async fn register_and_resolve() {
        let mut registry = CommandRegistry::new();
        registry.register::<Echo>().unwrap();

        let resolved = registry.resolve(&envelope_for(&Echo::new("hi"))).unwrap();
        let result = resolved.run_dyn().await.unwrap();
        assert_eq!(result.output.as_deref(), Some("hi"));
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register::<Echo>().unwrap();
        let result = registry.register::<Echo>();
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(t)) if t.name == "sample.echo"));
    }

    #[test]
    fn registered_types_are_sorted() {
        let mut registry = CommandRegistry::new();
        registry.register::<Echo>().unwrap();
        registry.register::<AlwaysFail>().unwrap();

        let names: Vec<_> = registry.registered_types().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["sample.always_fail", "sample.echo"]);
    }

    #[test]
    fn unknown_type_is_unresolvable() {
        let registry = CommandRegistry::new();
        let err = registry.resolve(&envelope_for(&Echo::new("hi"))).err().unwrap();
        assert!(matches!(err, CodecError::UnresolvableType { ref command_type, .. }
            if command_type == "sample.echo, ferry-sample"));
    }

    #[test]
    fn same_name_in_another_module_is_a_different_type() {
        let mut registry = CommandRegistry::new();
        registry.register::<Echo>().unwrap();

        let mut envelope = envelope_for(&Echo::new("hi"));
        envelope.command_module = "some-other-plugin".to_string();
        assert!(registry.resolve(&envelope).is_err());
    }

    #[test]
    fn payload_of_wrong_shape_is_unresolvable() {
        let mut registry = CommandRegistry::new();
        registry.register::<Echo>().unwrap();

        let mut envelope = envelope_for(&Echo::new("hi"));
        envelope.serialized_command = r#"{"unexpected": 1}"#.to_string();
        let err = registry.resolve(&envelope).err().unwrap();
        assert!(matches!(err, CodecError::UnresolvableType { .. }));
    }

    #[tokio::test]
    async fn lambda_resolves_by_name() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = CommandRegistry::new();
        let counter = calls.clone();
        registry
            .register_lambda("count", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        let resolved = registry.resolve(&envelope_for(&LambdaCommand::new("count"))).unwrap();
        let result = resolved.run_dyn().await.unwrap();

        assert!(result.successful);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_lambda_surfaces_its_error() {
        let mut registry = CommandRegistry::new();
        registry
            .register_lambda("explode", || async { Err(CommandError::new("kaboom")) })
            .unwrap();

        let resolved = registry.resolve(&envelope_for(&LambdaCommand::new("explode"))).unwrap();
        let err = resolved.run_dyn().await.unwrap_err();
        assert_eq!(err.to_string(), "kaboom");
    }

    #[test]
    fn missing_lambda_is_unresolvable() {
        let registry = CommandRegistry::new();
        let err = registry.resolve(&envelope_for(&LambdaCommand::new("ghost"))).err().unwrap();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn duplicate_lambda_is_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register_lambda("x", || async { Ok(()) }).unwrap();
        let result = registry.register_lambda("x", || async { Ok(()) });
        assert!(matches!(result, Err(RegistryError::LambdaAlreadyRegistered(n)) if n == "x"));
    }
}
