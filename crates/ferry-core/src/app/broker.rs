//! Broker - チャネルごとの 3 つのキューを操作する
//!
//! # キューの遷移
//! ```text
//! publish ──▶ Pending ──(atomic move)──▶ InProgress ──▶ (removed)   成功
//!                ▲                            │
//!                └──── retry budget 内 ───────┤
//!                                             └──────▶ Failed        失敗
//! Failed ──(republish, atomic move)──▶ Pending
//! ```
//!
//! Broker 自身はキューの状態を持ちません。状態はすべて QueueStore 側にあり、
//! 並行安全性は QueueStore の atomic move だけに依存します。

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::dispatcher::{DispatchError, Dispatcher};
use crate::domain::{Channel, CommandError, Composition, Envelope, EnvelopeId, ErrorKind, QueueKind};
use crate::observability::QueueCounts;
use crate::ports::{QueueStore, StoreError};
use crate::typed::{CodecError, DynCommand, EnvelopeCodec};

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("encoding command: {0}")]
    Encode(#[source] CodecError),

    #[error("decoding message: {0}")]
    Decode(#[source] CodecError),

    #[error("{0}")]
    UnresolvableType(#[source] CodecError),

    #[error("command {command_type} ({envelope_id}) failed: {source}")]
    CommandFailed {
        envelope_id: EnvelopeId,
        command_type: String,
        /// true なら retry budget 内で Pending に戻された
        requeued: bool,
        #[source]
        source: CommandError,
    },

    #[error("cleaning up {queue}: {source}")]
    Cleanup {
        queue: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BrokerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BrokerError::Encode(_) | BrokerError::Decode(_) | BrokerError::UnresolvableType(_) => {
                ErrorKind::Permanent
            }
            BrokerError::CommandFailed { .. } => ErrorKind::CommandFailure,
            BrokerError::Cleanup { .. } => ErrorKind::Cleanup,
            BrokerError::Store(_) => ErrorKind::Infrastructure,
        }
    }
}

pub struct Broker {
    store: Arc<dyn QueueStore>,
    channel: Channel,
    codec: EnvelopeCodec,
    dispatcher: Arc<Dispatcher>,
}

impl Broker {
    pub fn new(
        store: Arc<dyn QueueStore>,
        channel: Channel,
        codec: EnvelopeCodec,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            store,
            channel,
            codec,
            dispatcher,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn codec(&self) -> &EnvelopeCodec {
        &self.codec
    }

    fn key(&self, kind: QueueKind) -> String {
        self.channel.key(kind)
    }

    // ========================================
    // publish
    // ========================================

    pub async fn publish(&self, command: &dyn DynCommand) -> Result<EnvelopeId, BrokerError> {
        self.publish_with(command, Composition::default()).await
    }

    pub async fn publish_with(
        &self,
        command: &dyn DynCommand,
        composition: Composition,
    ) -> Result<EnvelopeId, BrokerError> {
        let envelope = self
            .codec
            .envelope(command, composition)
            .map_err(BrokerError::Encode)?;
        self.publish_envelope(&envelope).await?;
        Ok(envelope.id)
    }

    pub async fn publish_envelope(&self, envelope: &Envelope) -> Result<(), BrokerError> {
        let text = self.codec.to_text(envelope).map_err(BrokerError::Encode)?;
        self.push_pending(&text).await?;
        debug!(envelope_id = %envelope.id, command_type = %envelope.command_type, "published");
        Ok(())
    }

    pub(crate) async fn push_pending(&self, text: &str) -> Result<(), BrokerError> {
        self.store.push_left(&self.key(QueueKind::Pending), text).await?;
        Ok(())
    }

    // ========================================
    // consume
    // ========================================

    /// Take one message from Pending and execute it.
    ///
    /// - `Ok(false)`: Pending was empty, nothing changed
    /// - `Ok(true)`: the command succeeded and the message is gone
    /// - `Err(_)`: see `BrokerError::kind()`
    #[instrument(skip(self), fields(channel = %self.channel))]
    pub async fn consume(&self) -> Result<bool, BrokerError> {
        let pending = self.key(QueueKind::Pending);
        let in_progress = self.key(QueueKind::InProgress);

        let Some(message) = self.store.pop_right_push_left(&pending, &in_progress).await? else {
            return Ok(false);
        };
        debug!("moved message to in-progress");

        let envelope = match self.codec.decode(&message) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "undecodable message, moving to failed");
                self.quarantine(&message, message.clone()).await?;
                return Err(BrokerError::Decode(e));
            }
        };

        match self.dispatcher.execute(&envelope).await {
            Ok(result) => {
                self.cleanup_remove(&in_progress, &message).await?;
                info!(
                    envelope_id = %envelope.id,
                    command_type = %envelope.command_type,
                    message = %result.message,
                    "command completed"
                );
                Ok(true)
            }
            Err(DispatchError::Unresolvable(e)) => {
                warn!(envelope_id = %envelope.id, error = %e, "unresolvable command, moving to failed");
                let failed = self.annotated(&envelope.failed(e.to_string()), &message);
                self.quarantine(&message, failed).await?;
                Err(BrokerError::UnresolvableType(e))
            }
            Err(DispatchError::Failed(source)) => {
                let reason = source.to_string();
                let requeued = envelope.retries_remaining() > 0;
                if requeued {
                    let retry = envelope.retried(&reason);
                    warn!(
                        envelope_id = %envelope.id,
                        attempt = retry.attempts,
                        max_retries = envelope.composition.max_retries,
                        error = %reason,
                        "command failed, re-queueing"
                    );
                    let text = self.annotated(&retry, &message);
                    self.cleanup_remove(&in_progress, &message).await?;
                    self.cleanup_push(&pending, &text).await?;
                } else {
                    warn!(envelope_id = %envelope.id, error = %reason, "command failed, moving to failed");
                    let failed = self.annotated(&envelope.failed(&reason), &message);
                    self.quarantine(&message, failed).await?;
                }
                Err(BrokerError::CommandFailed {
                    envelope_id: envelope.id,
                    command_type: envelope.command_type().to_string(),
                    requeued,
                    source,
                })
            }
        }
    }

    /// Encoded copy of an updated envelope, or the original bytes if it cannot be encoded.
    fn annotated(&self, envelope: &Envelope, original: &str) -> String {
        self.codec
            .to_text(envelope)
            .unwrap_or_else(|_| original.to_string())
    }

    /// InProgress から外して Failed に積む
    async fn quarantine(&self, message: &str, failed_copy: String) -> Result<(), BrokerError> {
        self.cleanup_remove(&self.key(QueueKind::InProgress), message).await?;
        self.cleanup_push(&self.key(QueueKind::Failed), &failed_copy).await
    }

    async fn cleanup_remove(&self, queue: &str, message: &str) -> Result<(), BrokerError> {
        self.store
            .remove(queue, message, 1)
            .await
            .map(|_| ())
            .map_err(|source| BrokerError::Cleanup {
                queue: queue.to_string(),
                source,
            })
    }

    async fn cleanup_push(&self, queue: &str, message: &str) -> Result<(), BrokerError> {
        self.store
            .push_left(queue, message)
            .await
            .map(|_| ())
            .map_err(|source| BrokerError::Cleanup {
                queue: queue.to_string(),
                source,
            })
    }

    // ========================================
    // requeue
    // ========================================

    /// Move one message from Failed back to Pending. Returns false if Failed was empty.
    pub async fn republish_failed_messages(&self) -> Result<bool, BrokerError> {
        let moved = self
            .store
            .pop_right_push_left(&self.key(QueueKind::Failed), &self.key(QueueKind::Pending))
            .await?;
        if moved.is_some() {
            debug!("republished failed message");
        }
        Ok(moved.is_some())
    }

    pub async fn republish_all_failed_messages(&self) -> Result<u64, BrokerError> {
        let mut count = 0;
        while self.republish_failed_messages().await? {
            count += 1;
        }
        if count > 0 {
            info!(count, channel = %self.channel, "republished failed messages");
        }
        Ok(count)
    }

    // ========================================
    // inspection
    // ========================================

    pub async fn pending_queue_length(&self) -> Result<u64, BrokerError> {
        self.length(QueueKind::Pending).await
    }

    pub async fn in_progress_queue_length(&self) -> Result<u64, BrokerError> {
        self.length(QueueKind::InProgress).await
    }

    pub async fn failed_queue_length(&self) -> Result<u64, BrokerError> {
        self.length(QueueKind::Failed).await
    }

    pub async fn length(&self, kind: QueueKind) -> Result<u64, BrokerError> {
        Ok(self.store.length(&self.key(kind)).await?)
    }

    pub async fn counts(&self) -> Result<QueueCounts, BrokerError> {
        Ok(QueueCounts {
            pending: self.pending_queue_length().await?,
            in_progress: self.in_progress_queue_length().await?,
            failed: self.failed_queue_length().await?,
        })
    }

    /// Raw messages of one queue, head first, `LRANGE` index semantics.
    pub async fn peek(&self, kind: QueueKind, start: i64, stop: i64) -> Result<Vec<String>, BrokerError> {
        Ok(self.store.range(&self.key(kind), start, stop).await?)
    }

    // ========================================
    // maintenance
    // ========================================

    pub async fn clear_pending_queue(&self) -> Result<bool, BrokerError> {
        self.clear(QueueKind::Pending).await
    }

    pub async fn clear_in_progress_queue(&self) -> Result<bool, BrokerError> {
        self.clear(QueueKind::InProgress).await
    }

    pub async fn clear_failed_queue(&self) -> Result<bool, BrokerError> {
        self.clear(QueueKind::Failed).await
    }

    async fn clear(&self, kind: QueueKind) -> Result<bool, BrokerError> {
        let key = self.key(kind);
        let deleted = self.store.delete_key(&key).await?;
        info!(queue = %key, deleted, "cleared queue");
        Ok(deleted)
    }
}
