//! Session and credential lifecycle.
//!
//! This module provides:
//! - `token`: decoding of the claims segment of compact three-part tokens
//! - `SessionValidator`: structural and expiry checks against an injected clock
//! - `TokenStorage` backends: OS keychain, plain files, memory
//! - `CredentialStore`: self-healing token storage that never serves an invalid token
//! - `SessionManager`: login, registration, logout and identity queries
//!
//! Signatures are never verified here; tokens are issued and checked by the backend.

pub mod credentials;
pub mod error;
pub mod session;
pub mod storage;
pub mod token;
pub mod validator;

pub use credentials::{CredentialStore, REFRESH_TOKEN_KEY, TOKEN_KEY};
pub use error::{AuthError, StorageError, TokenError};
pub use session::{SessionEvent, SessionManager, SessionPolicy, SessionState};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, StorageKind, TokenStorage};
pub use token::{decode_claims, Claims};
pub use validator::{Clock, FixedClock, MissingExpiry, SessionValidator, SystemClock};
