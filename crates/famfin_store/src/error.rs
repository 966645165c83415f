//! Error types for the local durable store.

use famfin_storage::StorageError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised inside the store.
///
/// The public table and queue operations of [`crate::LocalStore`] absorb
/// these and log them; they only surface from `open` and the `try_*`
/// variants.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A journal frame could not be encoded.
    #[error("encoding failed: {message}")]
    Encode {
        /// Description of the failure.
        message: String,
    },

    /// A journal frame could not be decoded.
    #[error("journal corruption at offset {offset}: {message}")]
    Corruption {
        /// Offset of the offending frame.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch in a journal frame.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the offending frame.
        offset: u64,
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// Writing would exceed the configured quota.
    #[error("storage quota exceeded: {required} bytes required, quota is {quota}")]
    QuotaExceeded {
        /// Journal size the write would produce.
        required: u64,
        /// Configured quota.
        quota: u64,
    },

    /// The record to change is not cached.
    #[error("record not found: {id}")]
    NotFound {
        /// Missing record id.
        id: String,
    },

    /// A record does not belong to the partition it is written into.
    #[error("record {id} does not belong to the {kind} partition of family {family_id}")]
    ForeignRecord {
        /// Offending record.
        id: String,
        /// Partition kind.
        kind: famfin_protocol::EntityKind,
        /// Partition family.
        family_id: String,
    },

    /// Domain-level rejection, e.g. a patch for the wrong entity kind.
    #[error(transparent)]
    Protocol(#[from] famfin_protocol::ProtocolError),
}

impl StoreError {
    /// Creates an encoding error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::Corruption {
            offset,
            message: message.into(),
        }
    }
}
