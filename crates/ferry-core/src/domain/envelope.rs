//! Envelope - キューに格納される単位
//!
//! コマンドの型情報（type name + module）と JSON ペイロード、
//! リトライ回数、composition メタデータ（hooks, retry budget, chain）を持ちます。
//!
//! # Wire format
//! 1 メッセージ = 1 つの JSON object（文字列として list に格納）。
//! `format_version` が無い古いメッセージは version 1 として読みます。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hooks::Hooks;
use super::ids::{ChainId, EnvelopeId};

/// Highest envelope format this build can read and the one it writes.
pub const ENVELOPE_FORMAT_VERSION: u32 = 1;

fn default_format_version() -> u32 {
    1
}

/// Runtime identity of a command variant: type name + originating module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommandType {
    pub name: String,
    pub module: String,
}

impl CommandType {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.name, self.module)
    }
}

/// Position of one envelope inside a dispatched chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub chain_id: ChainId,
    /// 0-indexed.
    pub position: u32,
    pub length: u32,
}

impl ChainLink {
    pub fn is_first(&self) -> bool {
        self.position == 0
    }

    pub fn is_last(&self) -> bool {
        self.position + 1 >= self.length
    }
}

/// Hooks, retry budget and chain membership of a published job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    #[serde(default, skip_serializing_if = "Hooks::is_empty")]
    pub hooks: Hooks,

    /// Re-publish attempts allowed before the message stays in Failed.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_retries: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainLink>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Composition {
    pub fn is_plain(&self) -> bool {
        self.hooks.is_empty() && self.max_retries == 0 && self.chain.is_none()
    }
}

/// The unit stored in a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default = "default_format_version")]
    pub format_version: u32,

    pub id: EnvelopeId,

    pub command_type: String,
    pub command_module: String,

    /// The command serialized as JSON text.
    pub serialized_command: String,

    /// Number of times this envelope was re-published after a failure.
    #[serde(default)]
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Composition::is_plain")]
    pub composition: Composition,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enqueued_at: Option<DateTime<Utc>>,

    /// Verbatim error text of the last failed execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Envelope {
    pub fn new(id: EnvelopeId, command_type: &CommandType, serialized_command: String) -> Self {
        Self {
            format_version: ENVELOPE_FORMAT_VERSION,
            id,
            command_type: command_type.name.clone(),
            command_module: command_type.module.clone(),
            serialized_command,
            attempts: 0,
            composition: Composition::default(),
            enqueued_at: None,
            last_error: None,
        }
    }

    pub fn with_composition(mut self, composition: Composition) -> Self {
        self.composition = composition;
        self
    }

    pub fn with_enqueued_at(mut self, at: DateTime<Utc>) -> Self {
        self.enqueued_at = Some(at);
        self
    }

    pub fn command_type(&self) -> CommandType {
        CommandType::new(&self.command_type, &self.command_module)
    }

    pub fn retries_remaining(&self) -> u32 {
        self.composition.max_retries.saturating_sub(self.attempts)
    }

    /// Copy annotated with the failure, as it goes to the Failed queue.
    pub fn failed(&self, error: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.last_error = Some(error.into());
        copy
    }

    /// Copy for the next attempt, as it goes back to the Pending queue.
    pub fn retried(&self, error: impl Into<String>) -> Self {
        let mut copy = self.failed(error);
        copy.attempts += 1;
        copy
    }
}
