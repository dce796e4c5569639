use reqwest::StatusCode;
use thiserror::Error;

/// Why a token could not be accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token has expired")]
    Expired,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Token storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keychain access failed: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Failure of a login or registration attempt.
///
/// `Display` is the message shown to the user as-is.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Network error: {0}")]
    Network(String),

    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("Could not build request: {0}")]
    Request(String),

    #[error("Could not save session: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AuthError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
