//! Errors - エラー型と分類
//!
//! - `CommandError`: コマンドの `run()` が返すエラー
//! - `ErrorKind`: consumer 側で分岐するための運用分類

use thiserror::Error;

/// ErrorKind は consume 時のエラーの分類
///
/// - CommandFailure: コマンド自身の失敗（Failed へ移動 or リトライ）
/// - Permanent: 型解決・decode の失敗（リトライ無意味）
/// - Cleanup: 実行後の InProgress からの除去に失敗（副作用は既に発生済み）
/// - Infrastructure: キューストアの障害
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CommandFailure,
    Permanent,
    Cleanup,
    Infrastructure,
}

/// Error raised by a command run.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Failed(String),

    /// The command returned a result with `successful == false`.
    #[error("command reported failure: {0}")]
    Unsuccessful(String),

    /// `run()` panicked. Holds the panic message.
    #[error("command panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_displays_message_verbatim() {
        assert_eq!(CommandError::new("boom").to_string(), "boom");
    }

    #[test]
    fn io_errors_convert() {
        fn open() -> Result<(), CommandError> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing.txt"))?
        }
        let err = open().unwrap_err();
        assert!(matches!(err, CommandError::Io(_)));
        assert_eq!(err.to_string(), "missing.txt");
    }
}
