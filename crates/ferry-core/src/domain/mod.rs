//! Domain model (IDs, channels, envelopes, hooks, results, errors).

pub mod channel;
pub mod envelope;
pub mod errors;
pub mod hooks;
pub mod ids;
pub mod outcome;

pub use self::channel::{Channel, QueueKind, DEFAULT_BASE_NAME, PRIMARY_CHANNEL, SECONDARY_CHANNEL};
pub use self::envelope::{ChainLink, CommandType, Composition, Envelope, ENVELOPE_FORMAT_VERSION};
pub use self::errors::{CommandError, ErrorKind};
pub use self::hooks::{Hooks, OutputFile, WriteMode};
pub use self::ids::{ChainId, EnvelopeId};
pub use self::outcome::CommandResult;
