//! Structured responses of the remote data API.

use serde::{Deserialize, Serialize};

/// Response envelope returned by the hosted backend.
///
/// A present `error` means the call failed even when `data` is also set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Payload on success.
    pub data: Option<T>,
    /// Error message on failure.
    pub error: Option<String>,
    /// HTTP-like status code.
    pub status: u16,
}

impl<T> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: 200,
        }
    }

    /// Creates a successful response without payload.
    pub fn empty() -> Self {
        Self {
            data: None,
            error: None,
            status: 204,
        }
    }

    /// Creates an error response.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
            status,
        }
    }

    /// Returns true if no error is present.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
