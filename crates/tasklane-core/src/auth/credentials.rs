use std::sync::Arc;

use tracing::{debug, warn};

use super::storage::TokenStorage;
use super::token::Claims;
use super::validator::SessionValidator;
use super::{StorageError, TokenError};

/// Storage key for the access token.
pub const TOKEN_KEY: &str = "tasklane_jwt_token";

/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "tasklane_refresh_token";

/// Outcome of reading the access token.
#[derive(Debug)]
pub(crate) enum TokenRead {
    Missing,
    Valid { token: String, claims: Claims },
    /// A token was present but failed validation and has been removed.
    Evicted(TokenError),
}

/// Self-healing store for the session's credentials.
///
/// Reads never hand out a token that fails validation: a malformed or
/// expired token is removed the moment it is discovered.
pub struct CredentialStore {
    storage: Arc<dyn TokenStorage>,
    validator: SessionValidator,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn TokenStorage>, validator: SessionValidator) -> Self {
        Self { storage, validator }
    }

    pub fn validator(&self) -> &SessionValidator {
        &self.validator
    }

    pub fn put(&self, token: &str) -> Result<(), StorageError> {
        self.storage.set(TOKEN_KEY, token)
    }

    /// The stored access token, if present and valid.
    pub fn get(&self) -> Option<String> {
        match self.read() {
            TokenRead::Valid { token, .. } => Some(token),
            TokenRead::Missing | TokenRead::Evicted(_) => None,
        }
    }

    /// Claims of the stored access token, if present and valid.
    pub fn claims(&self) -> Option<Claims> {
        match self.read() {
            TokenRead::Valid { claims, .. } => Some(claims),
            TokenRead::Missing | TokenRead::Evicted(_) => None,
        }
    }

    /// The stored access token without any validation.
    pub fn raw(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read access token");
                None
            }
        }
    }

    pub fn remove(&self) -> Result<(), StorageError> {
        self.storage.remove(TOKEN_KEY)
    }

    pub fn put_refresh_token(&self, token: &str) -> Result<(), StorageError> {
        self.storage.set(REFRESH_TOKEN_KEY, token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        match self.storage.get(REFRESH_TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read refresh token");
                None
            }
        }
    }

    pub fn remove_refresh_token(&self) -> Result<(), StorageError> {
        self.storage.remove(REFRESH_TOKEN_KEY)
    }

    /// Remove both tokens. Attempts both removals even if the first fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        let access = self.remove();
        let refresh = self.remove_refresh_token();
        access.and(refresh)
    }

    pub(crate) fn read(&self) -> TokenRead {
        let Some(token) = self.raw() else {
            return TokenRead::Missing;
        };

        match self.validator.validate(&token) {
            Ok(claims) => TokenRead::Valid { token, claims },
            Err(reason) => {
                warn!(%reason, "Stored access token rejected, removing it");
                if let Err(e) = self.remove() {
                    warn!(error = %e, "Failed to remove rejected access token");
                } else {
                    debug!("Rejected access token removed");
                }
                TokenRead::Evicted(reason)
            }
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}
