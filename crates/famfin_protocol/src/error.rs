//! Error types for protocol-level validation.

use crate::record::EntityKind;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised when records and intents do not fit together.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A patch or draft was applied to a record of another kind.
    #[error("expected a {expected} payload, got {found}")]
    KindMismatch {
        /// Kind of the target record.
        expected: EntityKind,
        /// Kind carried by the payload.
        found: EntityKind,
    },

    /// An identifier that must not be empty was empty.
    #[error("{kind} record has an empty identifier")]
    EmptyId {
        /// Kind of the offending record.
        kind: EntityKind,
    },
}
