//! Job - publish 前の組み立て（fluent builder）
//!
//! # 使用例
//! ```ignore
//! Job::command(Echo::new("hello"))
//!     .ping_after("http://status.example.com/done")
//!     .write_output_to("/var/log/echo.txt")
//!     .with_retries(3)
//!     .dispatch(&broker)
//!     .await?;
//!
//! Job::chain()
//!     .then(Extract::default())
//!     .then(Load::default())
//!     .dispatch(&broker)
//!     .await?;
//! ```
//!
//! # Chain の hook 配置
//! - `ping_before` → 先頭リンクのみ
//! - `ping_after` → 末尾リンクのみ
//! - 出力ファイル・メール・retry budget → 全リンク
//!
//! リンクは独立した Envelope として順番に publish されます。
//! あるリンクが失敗しても他のリンクは実行されます。

use std::path::PathBuf;

use super::broker::{Broker, BrokerError};
use crate::domain::{ChainLink, Composition, Envelope, EnvelopeId, Hooks, OutputFile, WriteMode};
use crate::typed::{CodecError, Command, DynCommand, EnvelopeCodec, LambdaCommand};

enum Body {
    Single(Box<dyn DynCommand>),
    Chain(Vec<Box<dyn DynCommand>>),
}

pub struct Job {
    body: Body,
    hooks: Hooks,
    max_retries: u32,
}

impl Job {
    fn with_body(body: Body) -> Self {
        Self {
            body,
            hooks: Hooks::default(),
            max_retries: 0,
        }
    }

    pub fn command(command: impl Command) -> Self {
        Self::boxed(Box::new(command))
    }

    pub fn boxed(command: Box<dyn DynCommand>) -> Self {
        Self::with_body(Body::Single(command))
    }

    /// A closure registered under `name` in the consuming process.
    pub fn lambda(name: impl Into<String>) -> Self {
        Self::command(LambdaCommand::new(name))
    }

    pub fn commands(commands: impl IntoIterator<Item = Box<dyn DynCommand>>) -> Self {
        Self::with_body(Body::Chain(commands.into_iter().collect()))
    }

    pub fn chain() -> Self {
        Self::with_body(Body::Chain(Vec::new()))
    }

    /// Append a link. A single-command job becomes a chain.
    pub fn then(mut self, command: impl Command) -> Self {
        let next: Box<dyn DynCommand> = Box::new(command);
        self.body = match self.body {
            Body::Single(first) => Body::Chain(vec![first, next]),
            Body::Chain(mut links) => {
                links.push(next);
                Body::Chain(links)
            }
        };
        self
    }

    pub fn ping_before(mut self, url: impl Into<String>) -> Self {
        self.hooks.ping_before = Some(url.into());
        self
    }

    pub fn ping_after(mut self, url: impl Into<String>) -> Self {
        self.hooks.ping_after = Some(url.into());
        self
    }

    pub fn write_output_to(self, path: impl Into<PathBuf>) -> Self {
        self.output_to(path.into(), WriteMode::Truncate)
    }

    pub fn append_output_to(self, path: impl Into<PathBuf>) -> Self {
        self.output_to(path.into(), WriteMode::Append)
    }

    fn output_to(mut self, path: PathBuf, mode: WriteMode) -> Self {
        self.hooks.output_files.push(OutputFile { path, mode });
        self
    }

    pub fn email_output_to(mut self, recipient: impl Into<String>) -> Self {
        self.hooks.email_output_to.push(recipient.into());
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn len(&self) -> usize {
        match &self.body {
            Body::Single(_) => 1,
            Body::Chain(links) => links.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the envelopes this job publishes, in publish order.
    pub fn to_envelopes(&self, codec: &EnvelopeCodec) -> Result<Vec<Envelope>, CodecError> {
        match &self.body {
            Body::Single(command) => {
                let composition = Composition {
                    hooks: self.hooks.clone(),
                    max_retries: self.max_retries,
                    chain: None,
                };
                Ok(vec![codec.envelope(command.as_ref(), composition)?])
            }
            Body::Chain(links) => {
                let chain_id = codec.next_chain_id();
                let length = links.len() as u32;
                links
                    .iter()
                    .enumerate()
                    .map(|(i, command)| {
                        let link = ChainLink {
                            chain_id,
                            position: i as u32,
                            length,
                        };
                        let composition = Composition {
                            hooks: self.hooks_for(&link),
                            max_retries: self.max_retries,
                            chain: Some(link),
                        };
                        codec.envelope(command.as_ref(), composition)
                    })
                    .collect()
            }
        }
    }

    fn hooks_for(&self, link: &ChainLink) -> Hooks {
        Hooks {
            ping_before: self.hooks.ping_before.clone().filter(|_| link.is_first()),
            ping_after: self.hooks.ping_after.clone().filter(|_| link.is_last()),
            output_files: self.hooks.output_files.clone(),
            email_output_to: self.hooks.email_output_to.clone(),
        }
    }

    /// Encode every link, then publish them in order.
    ///
    /// An encode error publishes nothing.
    pub async fn dispatch(self, broker: &Broker) -> Result<Vec<EnvelopeId>, BrokerError> {
        let envelopes = self.to_envelopes(broker.codec()).map_err(BrokerError::Encode)?;
        let texts = envelopes
            .iter()
            .map(|e| broker.codec().to_text(e))
            .collect::<Result<Vec<_>, _>>()
            .map_err(BrokerError::Encode)?;

        for text in &texts {
            broker.push_pending(text).await?;
        }
        Ok(envelopes.into_iter().map(|e| e.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_codec, AlwaysFail, AlwaysSucceed, Echo};

    #[test]
    fn single_command_carries_all_hooks() {
        let job = Job::command(Echo::new("hi"))
            .ping_before("http://a")
            .ping_after("http://b")
            .write_output_to("out.txt")
            .append_output_to("log.txt")
            .email_output_to("ops@example.com")
            .with_retries(2);

        let envelopes = job.to_envelopes(&test_codec()).unwrap();
        assert_eq!(envelopes.len(), 1);

        let composition = &envelopes[0].composition;
        assert_eq!(composition.max_retries, 2);
        assert!(composition.chain.is_none());
        assert_eq!(composition.hooks.ping_before.as_deref(), Some("http://a"));
        assert_eq!(composition.hooks.ping_after.as_deref(), Some("http://b"));
        assert_eq!(
            composition.hooks.output_files.iter().map(|f| f.mode).collect::<Vec<_>>(),
            vec![WriteMode::Truncate, WriteMode::Append]
        );
        assert_eq!(composition.hooks.email_output_to, vec!["ops@example.com"]);
    }

    #[test]
    fn chain_places_hooks_by_position() {
        let job = Job::chain()
            .then(Echo::new("1"))
            .then(AlwaysFail)
            .then(AlwaysSucceed)
            .ping_before("http://start")
            .ping_after("http://end")
            .write_output_to("out.txt")
            .with_retries(1);

        let envelopes = job.to_envelopes(&test_codec()).unwrap();
        assert_eq!(envelopes.len(), 3);

        let chain_ids: Vec<_> = envelopes
            .iter()
            .map(|e| e.composition.chain.unwrap().chain_id)
            .collect();
        assert!(chain_ids.iter().all(|id| *id == chain_ids[0]));

        for (i, e) in envelopes.iter().enumerate() {
            let link = e.composition.chain.unwrap();
            assert_eq!(link.position, i as u32);
            assert_eq!(link.length, 3);
            assert_eq!(e.composition.max_retries, 1);
            assert_eq!(e.composition.hooks.output_files.len(), 1);
        }
        assert!(envelopes[0].composition.hooks.ping_before.is_some());
        assert!(envelopes[1].composition.hooks.ping_before.is_none());
        assert!(envelopes[1].composition.hooks.ping_after.is_none());
        assert!(envelopes[2].composition.hooks.ping_after.is_some());
    }

    #[test]
    fn then_turns_a_single_job_into_a_chain() {
        let job = Job::command(Echo::new("a")).then(Echo::new("b"));
        assert_eq!(job.len(), 2);

        let envelopes = job.to_envelopes(&test_codec()).unwrap();
        assert!(envelopes.iter().all(|e| e.composition.chain.is_some()));
    }

    #[test]
    fn commands_builds_a_chain_from_a_list() {
        let job = Job::commands(vec![
            Box::new(Echo::new("a")) as Box<dyn DynCommand>,
            Box::new(AlwaysSucceed),
        ]);
        assert_eq!(job.len(), 2);
    }

    #[test]
    fn lambda_job_references_the_name() {
        let envelopes = Job::lambda("nightly").to_envelopes(&test_codec()).unwrap();
        assert_eq!(envelopes[0].command_type, "ferry.lambda");
        assert_eq!(envelopes[0].serialized_command, r#"{"name":"nightly"}"#);
    }

    #[test]
    fn empty_chain_has_no_envelopes() {
        let job = Job::chain();
        assert!(job.is_empty());
        assert!(job.to_envelopes(&test_codec()).unwrap().is_empty());
    }
}
