//! EnvelopeCodec - Command と Envelope テキストの相互変換
//!
//! # エンコードフロー
//! 1. Command の payload を JSON 文字列にする
//! 2. 型識別子・composition・ID・enqueue 時刻と一緒に Envelope に包む
//! 3. Envelope を 1 行の JSON テキストにする（これがキューに載るバイト列）
//!
//! # デコードフロー
//! 1. JSON として読めなければ `MalformedEnvelope`
//! 2. `format_version` がこのコーデックより新しければ `UnsupportedVersion`
//! 3. Command への解決は `CommandRegistry::resolve`（`UnresolvableType`）

use std::sync::Arc;

use serde_json::Value;

use super::command::DynCommand;
use crate::domain::{ChainId, Composition, Envelope, ENVELOPE_FORMAT_VERSION};
use crate::ports::{Clock, IdGenerator};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encoding command {command_type}: {source}")]
    Encode {
        command_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    #[error("envelope format version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u64, supported: u32 },

    #[error("unresolvable command type '{command_type}': {reason}")]
    UnresolvableType { command_type: String, reason: String },
}

impl CodecError {
    /// Errors that make a stored message permanently unprocessable.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, CodecError::Encode { .. })
    }
}

#[derive(Clone)]
pub struct EnvelopeCodec {
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl EnvelopeCodec {
    pub fn new(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self { ids, clock }
    }

    pub fn next_chain_id(&self) -> ChainId {
        self.ids.generate_chain_id()
    }

    /// Wrap a command into a fresh envelope (new id, enqueue time = now).
    pub fn envelope(
        &self,
        command: &dyn DynCommand,
        composition: Composition,
    ) -> Result<Envelope, CodecError> {
        let command_type = command.command_type();
        let payload = command.serialize_payload().map_err(|source| CodecError::Encode {
            command_type: command_type.to_string(),
            source,
        })?;

        Ok(Envelope::new(self.ids.generate_envelope_id(), &command_type, payload)
            .with_composition(composition)
            .with_enqueued_at(self.clock.now()))
    }

    pub fn encode(
        &self,
        command: &dyn DynCommand,
        composition: Composition,
    ) -> Result<String, CodecError> {
        let envelope = self.envelope(command, composition)?;
        self.to_text(&envelope)
    }

    pub fn to_text(&self, envelope: &Envelope) -> Result<String, CodecError> {
        serde_json::to_string(envelope).map_err(|source| CodecError::Encode {
            command_type: envelope.command_type().to_string(),
            source,
        })
    }

    pub fn decode(&self, text: &str) -> Result<Envelope, CodecError> {
        let value: Value = serde_json::from_str(text).map_err(CodecError::MalformedEnvelope)?;

        // 形を読む前にバージョンを確認する
        if let Some(found) = value.get("format_version").and_then(Value::as_u64) {
            if found > u64::from(ENVELOPE_FORMAT_VERSION) {
                return Err(CodecError::UnsupportedVersion {
                    found,
                    supported: ENVELOPE_FORMAT_VERSION,
                });
            }
        }

        serde_json::from_value(value).map_err(CodecError::MalformedEnvelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommandType, Hooks};
    use crate::ports::{FixedClock, UlidGenerator};
    use crate::testing::{fixed_time, Echo};

    fn codec() -> EnvelopeCodec {
        let clock = Arc::new(FixedClock::new(fixed_time()));
        EnvelopeCodec::new(Arc::new(UlidGenerator::new(clock.clone())), clock)
    }

    #[test]
    fn encode_then_decode_preserves_everything() {
        let codec = codec();
        let composition = Composition {
            hooks: Hooks {
                ping_before: Some("http://example.com/start".to_string()),
                ..Hooks::default()
            },
            max_retries: 2,
            chain: None,
        };

        let text = codec.encode(&Echo::new("hi"), composition.clone()).unwrap();
        let envelope = codec.decode(&text).unwrap();

        assert_eq!(envelope.command_type(), CommandType::new("sample.echo", "ferry-sample"));
        assert_eq!(envelope.serialized_command, r#"{"verbatim_text":"hi"}"#);
        assert_eq!(envelope.composition, composition);
        assert_eq!(envelope.enqueued_at, Some(fixed_time()));
        assert_eq!(envelope.attempts, 0);
        assert_eq!(codec.to_text(&envelope).unwrap(), text);
    }

    #[test]
    fn every_encode_gets_a_fresh_id() {
        let codec = codec();
        let a = codec.envelope(&Echo::new("x"), Composition::default()).unwrap();
        let b = codec.envelope(&Echo::new("x"), Composition::default()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn garbage_is_malformed() {
        let err = codec().decode("definitely not json").unwrap_err();
        assert!(matches!(err, CodecError::MalformedEnvelope(_)));
        assert!(err.is_permanent());
    }

    #[test]
    fn missing_fields_are_malformed() {
        let err = codec().decode(r#"{"command_type": "sample.echo"}"#).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEnvelope(_)));
    }

    #[test]
    fn newer_format_version_is_rejected() {
        let err = codec()
            .decode(r#"{"format_version": 7, "shape": "from the future"}"#)
            .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedVersion { found: 7, supported: 1 }));
    }
}
