//! `confero-core` — messaging foundation building blocks.
//!
//! This crate contains **pure primitives** (identifiers, the message-kind
//! discriminator, the core error model). No infrastructure concerns.

pub mod error;
pub mod id;
pub mod kind;

pub use error::{CoreError, CoreResult};
pub use id::{MessageId, SourceId};
pub use kind::MessageKind;
