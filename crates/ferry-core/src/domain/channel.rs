//! Channel - 論理キューのグルーピング
//!
//! 1 つの Channel は Pending / InProgress / Failed の 3 つのキューを持ちます。
//! キー名は `<BaseName>:<ChannelName>:<Queue>` 形式で、管理ツールが
//! prefix で列挙できるようにしています。

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_NAME: &str = "Ferry:Queue";
pub const PRIMARY_CHANNEL: &str = "Primary";
pub const SECONDARY_CHANNEL: &str = "Secondary";

/// One of the three queues owned by a channel.
///
/// Message flow:
/// - Pending -> InProgress (atomic move on consume)
/// - InProgress -> removed (success)
/// - InProgress -> Failed (command failure, unresolvable type)
/// - InProgress -> Pending (retry budget left)
/// - Failed -> Pending (operator republish)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueKind {
    Pending,
    InProgress,
    Failed,
}

impl QueueKind {
    pub const ALL: [QueueKind; 3] = [QueueKind::Pending, QueueKind::InProgress, QueueKind::Failed];

    pub fn as_str(self) -> &'static str {
        match self {
            QueueKind::Pending => "Pending",
            QueueKind::InProgress => "InProgress",
            QueueKind::Failed => "Failed",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named logical queue grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel {
    base_name: String,
    name: String,
}

impl Channel {
    pub fn new(base_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            name: name.into(),
        }
    }

    pub fn primary(base_name: impl Into<String>) -> Self {
        Self::new(base_name, PRIMARY_CHANNEL)
    }

    pub fn secondary(base_name: impl Into<String>) -> Self {
        Self::new(base_name, SECONDARY_CHANNEL)
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store key of one of this channel's queues.
    pub fn key(&self, kind: QueueKind) -> String {
        format!("{}:{}:{}", self.base_name, self.name, kind)
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::primary(DEFAULT_BASE_NAME)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.base_name, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(QueueKind::Pending, "Ferry:Queue:Primary:Pending")]
    #[case(QueueKind::InProgress, "Ferry:Queue:Primary:InProgress")]
    #[case(QueueKind::Failed, "Ferry:Queue:Primary:Failed")]
    fn default_channel_keys(#[case] kind: QueueKind, #[case] expected: &str) {
        assert_eq!(Channel::default().key(kind), expected);
    }

    #[test]
    fn secondary_channel_uses_custom_base_name() {
        let channel = Channel::secondary("Acme:Jobs");
        assert_eq!(channel.key(QueueKind::Failed), "Acme:Jobs:Secondary:Failed");
        assert_eq!(channel.to_string(), "Acme:Jobs:Secondary");
    }

    #[test]
    fn keys_are_distinct_per_queue() {
        let channel = Channel::default();
        let keys: std::collections::HashSet<_> =
            QueueKind::ALL.iter().map(|k| channel.key(*k)).collect();
        assert_eq!(keys.len(), 3);
    }
}
