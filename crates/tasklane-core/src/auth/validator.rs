//! Structural and temporal validation of stored tokens.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::token::{decode_claims, Claims, TOKEN_SEGMENTS};
use super::TokenError;

/// Default buffer before expiry at which a session counts as needing refresh (5 minutes).
pub const DEFAULT_REFRESH_BUFFER_SECS: i64 = 5 * 60;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// How to treat a token whose claims carry no `exp`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingExpiry {
    /// Fail closed: a token without `exp` is never valid.
    #[default]
    Expired,
    /// A token without `exp` never expires.
    NeverExpires,
}

#[derive(Clone)]
pub struct SessionValidator {
    clock: Arc<dyn Clock>,
    missing_expiry: MissingExpiry,
    refresh_buffer: Duration,
}

impl SessionValidator {
    pub fn new(clock: Arc<dyn Clock>, missing_expiry: MissingExpiry) -> Self {
        Self {
            clock,
            missing_expiry,
            refresh_buffer: Duration::seconds(DEFAULT_REFRESH_BUFFER_SECS),
        }
    }

    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current time in fractional seconds, comparable with `exp`.
    fn now_secs(&self) -> f64 {
        self.clock.now().timestamp_millis() as f64 / 1000.0
    }

    /// True when the token has exactly three dot-separated segments.
    /// Does not look inside any segment.
    pub fn is_structurally_valid(&self, token: &str) -> bool {
        token.split('.').count() == TOKEN_SEGMENTS
    }

    pub fn is_expired(&self, claims: &Claims) -> bool {
        match claims.exp {
            Some(exp) => exp < self.now_secs(),
            None => self.missing_expiry == MissingExpiry::Expired,
        }
    }

    /// Full check: structure, decodability and expiry. Returns the decoded
    /// claims of a valid token.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        if !self.is_structurally_valid(token) {
            return Err(TokenError::Malformed(format!(
                "expected {} segments",
                TOKEN_SEGMENTS
            )));
        }
        let claims = decode_claims(token)?;
        if self.is_expired(&claims) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.validate(token).is_ok()
    }

    /// True once the session is inside the refresh buffer before `exp`.
    /// Tokens without `exp` follow the missing-expiry policy.
    pub fn needs_refresh(&self, claims: &Claims) -> bool {
        match claims.exp {
            Some(exp) => {
                let buffer_secs = self.refresh_buffer.num_milliseconds() as f64 / 1000.0;
                self.now_secs() >= exp - buffer_secs
            }
            None => self.missing_expiry == MissingExpiry::Expired,
        }
    }

    /// Time remaining before `exp`, never negative. `None` without `exp`.
    /// Saturates at `Duration::MAX` for an `exp` beyond the representable range.
    pub fn time_until_expiry(&self, claims: &Claims) -> Option<Duration> {
        let exp = claims.exp?;
        let remaining_ms = ((exp - self.now_secs()) * 1000.0).max(0.0);
        Some(Duration::try_milliseconds(remaining_ms as i64).unwrap_or(Duration::MAX))
    }
}

impl std::fmt::Debug for SessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionValidator")
            .field("missing_expiry", &self.missing_expiry)
            .field("refresh_buffer", &self.refresh_buffer)
            .finish()
    }
}
