//! Typed - 型付き Command API
//!
//! このモジュールは型識別子の typo を型で排除し、
//! Envelope と Command の対応付けを Registry で保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `Command` trait - 型安全
//! - **内部（Dyn）**: `DynCommand` trait - object-safe, type erasure

pub mod codec;
pub mod command;
pub mod registry;

pub use self::codec::{CodecError, EnvelopeCodec};
pub use self::command::{command_type_of, Command, DynCommand, LambdaCommand};
pub use self::registry::{CommandRegistry, LambdaFn, RegistryError};
