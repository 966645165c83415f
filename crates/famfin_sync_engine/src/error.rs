//! Error types for the sync engine.

use famfin_protocol::{EntityKind, ProtocolError};
use famfin_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while recording or replaying mutations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport fault; the remote gave no structured answer.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The remote answered with a structured error.
    #[error("remote error ({status}): {message}")]
    Remote {
        /// HTTP-like status.
        status: u16,
        /// Message from the remote.
        message: String,
    },

    /// Local store error while recording.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The local store refused a write it absorbed and logged.
    #[error("local store rejected {operation}")]
    StoreRejected {
        /// Rejected operation.
        operation: String,
    },

    /// Domain-level rejection.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A create succeeded without a usable server id.
    #[error("remote returned no server id for created {kind}")]
    MissingServerId {
        /// Kind of the created record.
        kind: EntityKind,
    },

    /// An entry still points at a provisional id.
    #[error("unresolved provisional id {id}")]
    UnresolvedProvisional {
        /// The provisional id.
        id: String,
    },

    /// A freshly generated provisional id is already cached.
    #[error("provisional id collision: {id}")]
    ProvisionalIdCollision {
        /// The colliding id.
        id: String,
    },

    /// Another pass holds the busy flag.
    #[error("sync already in progress")]
    PassInProgress,

    /// Connectivity reports offline.
    #[error("cannot sync while offline")]
    Offline,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a store rejection error.
    pub fn store_rejected(operation: impl Into<String>) -> Self {
        Self::StoreRejected {
            operation: operation.into(),
        }
    }

    /// Returns true if a later pass may succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Remote { status, .. } => *status >= 500 || *status == 429,
            SyncError::UnresolvedProvisional { .. }
            | SyncError::PassInProgress
            | SyncError::Offline => true,
            _ => false,
        }
    }
}
