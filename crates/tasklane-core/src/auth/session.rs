use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::credentials::{CredentialStore, TokenRead};
use super::token::Claims;
use super::validator::{MissingExpiry, DEFAULT_REFRESH_BUFFER_SECS};
use super::AuthError;
use crate::api::error::detail_message;
use crate::api::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::models::Identity;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const RENEW_PATH: &str = "/auth/refresh";

/// Capacity of the session event channel. Slow subscribers lag rather than block.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Switches for behavior that differs between deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// Validate (and evict) the stored token before handing it to a request.
    pub validate_on_read: bool,
    /// After a successful registration, log in again instead of using the
    /// registration response's token.
    pub chain_login_after_register: bool,
    pub missing_expiry: MissingExpiry,
    /// Clear the local session when an authenticated call comes back 401.
    pub logout_on_unauthorized: bool,
    /// How long before `exp` the session reports that it needs refreshing.
    pub refresh_buffer_secs: i64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            validate_on_read: true,
            chain_login_after_register: false,
            missing_expiry: MissingExpiry::Expired,
            logout_on_unauthorized: false,
            refresh_buffer_secs: DEFAULT_REFRESH_BUFFER_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Active,
}

/// Broadcast to in-process listeners when the session changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(Identity),
    LoggedOut,
    /// The session ended without a logout: the stored token was rejected on
    /// read, or the backend answered 401 under `logout_on_unauthorized`.
    Invalidated,
}

/// Body of a successful login or registration.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token: Option<String>,
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_tokens(self) -> (Option<String>, Option<String>) {
        let access = self
            .access_token
            .filter(|t| !t.is_empty())
            .or(self.token.filter(|t| !t.is_empty()));
        (access, self.refresh_token.filter(|t| !t.is_empty()))
    }
}

/// Owns the session lifecycle: login, registration, logout and the
/// accessors every authenticated call depends on.
pub struct SessionManager {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    store: Arc<CredentialStore>,
    policy: SessionPolicy,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: impl Into<String>,
        store: Arc<CredentialStore>,
        policy: SessionPolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
            policy,
            events,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn notify(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    // ===== Login / Registration =====

    /// Authenticate with email and password and store the issued token.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let body = json!({ "email": email, "password": password });
        let response = self.post_credentials(LOGIN_PATH, &body, "Login failed").await?;
        self.establish(response)
    }

    /// Create an account. Depending on policy, either store the token from the
    /// registration response or follow up with a login.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let body = json!({ "name": name, "email": email, "password": password });
        let response = self
            .post_credentials(REGISTER_PATH, &body, "Registration failed")
            .await?;

        if self.policy.chain_login_after_register {
            debug!("Registration succeeded, logging in");
            return self.login(email, password).await;
        }
        self.establish(response)
    }

    async fn post_credentials(
        &self,
        path: &str,
        body: &serde_json::Value,
        fallback: &str,
    ) -> Result<HttpResponse, AuthError> {
        let request = HttpRequest::json(Method::POST, self.endpoint(path), body)
            .map_err(|e| AuthError::Request(e.to_string()))?;
        self.exchange(request, path, fallback).await
    }

    async fn exchange(
        &self,
        request: HttpRequest,
        path: &str,
        fallback: &str,
    ) -> Result<HttpResponse, AuthError> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status.is_success() {
            let message = detail_message(&response.body).unwrap_or_else(|| fallback.to_string());
            debug!(status = response.status.as_u16(), path, "Credentials rejected");
            return Err(AuthError::Rejected {
                status: response.status,
                message,
            });
        }
        Ok(response)
    }

    /// Validate the issued token and persist it. Nothing is written unless the
    /// token would pass a subsequent read.
    fn establish(&self, response: HttpResponse) -> Result<Identity, AuthError> {
        let parsed: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let (access, refresh) = parsed.into_tokens();
        let token =
            access.ok_or_else(|| AuthError::InvalidResponse("no access token".to_string()))?;

        let claims = self
            .store
            .validator()
            .validate(&token)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        // Refresh slot first; the access token is what makes the session active.
        match refresh {
            Some(refresh) => self.store.put_refresh_token(&refresh)?,
            None => self.store.remove_refresh_token()?,
        }
        if let Err(e) = self.store.put(&token) {
            if let Err(cleanup) = self.store.remove_refresh_token() {
                warn!(error = %cleanup, "Failed to drop refresh token after failed save");
            }
            return Err(e.into());
        }

        let identity = claims.identity();
        info!(user_id = %identity.id, "Session established");
        self.notify(SessionEvent::LoggedIn(identity.clone()));
        Ok(identity)
    }

    /// Exchange the current valid token for a fresh one via `/auth/refresh`.
    ///
    /// Unlike [`refresh_session`](Self::refresh_session) this needs no refresh
    /// token, only a session that has not yet expired. A 401 is reported to
    /// [`handle_unauthorized`](Self::handle_unauthorized).
    pub async fn renew(&self) -> Result<Identity, AuthError> {
        let (token, _) = self.current().ok_or(AuthError::NotAuthenticated)?;

        let mut request = HttpRequest::new(Method::POST, self.endpoint(RENEW_PATH));
        request
            .bearer_auth(&token)
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let response = match self.exchange(request, RENEW_PATH, "Session renewal failed").await {
            Err(e) if e.status() == Some(StatusCode::UNAUTHORIZED) => {
                self.handle_unauthorized();
                return Err(e);
            }
            other => other?,
        };
        debug!("Session renewed");
        self.establish(response)
    }

    // ===== Logout =====

    /// End the session. The backend is told on a best-effort basis; local
    /// credentials are cleared regardless of its answer.
    pub async fn logout(&self) {
        if let Some(token) = self.store.get() {
            self.notify_backend_logout(&token).await;
        }

        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        self.notify(SessionEvent::LoggedOut);
        info!("Logged out");
    }

    async fn notify_backend_logout(&self, token: &str) {
        let mut request = HttpRequest::new(Method::POST, self.endpoint(LOGOUT_PATH));
        if let Err(e) = request.bearer_auth(token) {
            warn!(error = %e, "Skipping remote logout");
            return;
        }

        match self.transport.send(request).await {
            Ok(response) if response.status.is_success() => debug!("Remote logout acknowledged"),
            Ok(response) => debug!(status = response.status.as_u16(), "Remote logout refused"),
            Err(e) => warn!(error = %e, "Remote logout failed"),
        }
    }

    // ===== Accessors =====

    fn current(&self) -> Option<(String, Claims)> {
        match self.store.read() {
            TokenRead::Valid { token, claims } => Some((token, claims)),
            TokenRead::Missing => None,
            TokenRead::Evicted(_) => {
                self.notify(SessionEvent::Invalidated);
                None
            }
        }
    }

    /// Token to attach to an authenticated request.
    pub fn valid_token(&self) -> Option<String> {
        if !self.policy.validate_on_read {
            return self.store.raw();
        }
        self.current().map(|(token, _)| token)
    }

    pub fn identity(&self) -> Option<Identity> {
        self.current().map(|(_, claims)| claims.identity())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.current().and_then(|(_, claims)| claims.expires_at())
    }

    pub fn time_until_expiry(&self) -> Option<Duration> {
        let (_, claims) = self.current()?;
        self.store.validator().time_until_expiry(&claims)
    }

    pub fn needs_refresh(&self) -> bool {
        self.current()
            .map(|(_, claims)| self.store.validator().needs_refresh(&claims))
            .unwrap_or(false)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.is_authenticated() {
            SessionState::Active
        } else {
            SessionState::Anonymous
        }
    }

    /// Try to extend the session with the stored refresh token.
    ///
    /// The backend offers no refresh-token exchange, so this always resolves
    /// to `false` and the caller must re-authenticate.
    pub async fn refresh_session(&self) -> bool {
        if self.store.refresh_token().is_none() {
            debug!("No refresh token stored");
            return false;
        }
        warn!("Refresh token present but token exchange is unsupported; re-authentication required");
        false
    }

    /// Called when an authenticated request is answered with 401.
    pub fn handle_unauthorized(&self) {
        if !self.policy.logout_on_unauthorized {
            debug!("Unauthorized response, leaving session in place");
            return;
        }
        warn!("Backend rejected the session token, clearing local session");
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        self.notify(SessionEvent::Invalidated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::TransportError;
    use crate::auth::token::encode_unsigned;
    use crate::auth::{REFRESH_TOKEN_KEY, TOKEN_KEY};
    use crate::test_utils::{token_for, FailingStorage, Harness, BASE_URL, NOW};
    use reqwest::header::AUTHORIZATION;
    use serde_json::Value;

    fn body_of(request: &HttpRequest) -> Value {
        serde_json::from_slice(request.body.as_deref().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_login_stores_token_and_returns_identity() {
        let h = Harness::new();
        let token = token_for("42", NOW + 3600);
        h.transport.push_json(200, json!({ "access_token": token }));

        let identity = h.session.login("a@b.com", "x").await.unwrap();
        assert_eq!(identity.id, "42");
        assert_eq!(h.session.identity().unwrap().id, "42");
        assert_eq!(h.session.valid_token(), Some(token));

        let request = h.transport.last_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, format!("{}/auth/login", BASE_URL));
        assert_eq!(body_of(&request), json!({"email": "a@b.com", "password": "x"}));
    }

    #[tokio::test]
    async fn test_login_accepts_numeric_subject_and_token_field() {
        let h = Harness::new();
        let token = encode_unsigned(&json!({"sub": 42, "email": "a@b.com", "exp": NOW + 60})).unwrap();
        h.transport.push_json(200, json!({ "token": token, "user": {"id": 42} }));

        let identity = h.session.login("a@b.com", "x").await.unwrap();
        assert_eq!(identity.id, "42");
        assert_eq!(identity.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_login_rejected_uses_detail_and_leaves_store_empty() {
        let h = Harness::new();
        h.transport.push_json(401, json!({ "detail": "bad credentials" }));

        let err = h.session.login("a@b.com", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "bad credentials");
        assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
        assert_eq!(h.store.raw(), None);
        assert_eq!(h.session.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_login_rejected_without_detail_uses_generic_message() {
        let h = Harness::new();
        h.transport.push_raw(500, "Internal Server Error");

        let err = h.session.login("a@b.com", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
    }

    #[tokio::test]
    async fn test_login_network_failure() {
        let h = Harness::new();
        h.transport
            .push_error(TransportError::Connection("connection refused".into()));

        let err = h.session.login("a@b.com", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::Network(ref m) if m == "connection refused"));
        assert_eq!(h.store.raw(), None);
    }

    #[tokio::test]
    async fn test_login_with_unusable_token_stores_nothing() {
        let h = Harness::new();
        h.transport.push_json(200, json!({ "access_token": "garbage" }));
        let err = h.session.login("a@b.com", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(_)));

        h.transport.push_json(200, json!({ "user": {} }));
        let err = h.session.login("a@b.com", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(_)));

        h.transport
            .push_json(200, json!({ "access_token": token_for("1", NOW - 5) }));
        let err = h.session.login("a@b.com", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(_)));

        assert_eq!(h.store.raw(), None);
    }

    #[tokio::test]
    async fn test_login_stores_refresh_token_when_issued() {
        let h = Harness::new();
        h.transport.push_json(
            200,
            json!({ "access_token": token_for("1", NOW + 60), "refresh_token": "r1" }),
        );
        h.session.login("a@b.com", "x").await.unwrap();
        assert_eq!(h.store.refresh_token().as_deref(), Some("r1"));

        // A later login without a refresh token drops the stale one.
        h.transport
            .push_json(200, json!({ "access_token": token_for("1", NOW + 60) }));
        h.session.login("a@b.com", "x").await.unwrap();
        assert_eq!(h.store.refresh_token(), None);
    }

    #[tokio::test]
    async fn test_failed_refresh_slot_write_leaves_session_anonymous() {
        let h = Harness::with_storage(
            SessionPolicy::default(),
            Arc::new(FailingStorage::new(REFRESH_TOKEN_KEY)),
        );
        h.transport.push_json(
            200,
            json!({ "access_token": token_for("1", NOW + 60), "refresh_token": "r1" }),
        );

        let err = h.session.login("a@b.com", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
        assert_eq!(h.store.raw(), None);
        assert_eq!(h.session.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_failed_access_token_write_drops_refresh_token() {
        let h = Harness::with_storage(
            SessionPolicy::default(),
            Arc::new(FailingStorage::new(TOKEN_KEY)),
        );
        h.transport.push_json(
            200,
            json!({ "access_token": token_for("1", NOW + 60), "refresh_token": "r1" }),
        );

        let err = h.session.login("a@b.com", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
        assert_eq!(h.store.refresh_token(), None);
        assert_eq!(h.session.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_renew_replaces_token_using_bearer() {
        let h = Harness::new();
        let old = token_for("1", NOW + 60);
        let fresh = token_for("1", NOW + 1800);
        h.store.put(&old).unwrap();
        h.transport
            .push_json(200, json!({ "access_token": fresh, "token_type": "bearer", "user": {"id": 1} }));

        let identity = h.session.renew().await.unwrap();
        assert_eq!(identity.id, "1");
        assert_eq!(h.session.valid_token(), Some(fresh));

        let request = h.transport.last_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, format!("{}/auth/refresh", BASE_URL));
        assert_eq!(
            request.headers.get(AUTHORIZATION).unwrap().to_str().unwrap(),
            format!("Bearer {}", old)
        );
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn test_renew_rejected_keeps_session_by_default() {
        let h = Harness::new();
        let token = token_for("1", NOW + 60);
        h.store.put(&token).unwrap();
        h.transport
            .push_json(401, json!({ "detail": "Could not validate credentials" }));

        let err = h.session.renew().await.unwrap_err();
        assert_eq!(err.to_string(), "Could not validate credentials");
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(h.session.valid_token(), Some(token));

        let h = Harness::with_policy(SessionPolicy {
            logout_on_unauthorized: true,
            ..SessionPolicy::default()
        });
        h.store.put(&token_for("1", NOW + 60)).unwrap();
        h.transport.push_raw(401, "");
        let err = h.session.renew().await.unwrap_err();
        assert_eq!(err.to_string(), "Session renewal failed");
        assert!(!h.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_renew_without_valid_token_sends_nothing() {
        let h = Harness::new();
        let err = h.session.renew().await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));

        h.store.put(&token_for("1", NOW - 1)).unwrap();
        let err = h.session.renew().await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
        assert_eq!(h.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_register_uses_registration_token_by_default() {
        let h = Harness::new();
        h.transport
            .push_json(200, json!({ "access_token": token_for("new-user", NOW + 60) }));

        let identity = h.session.register("Ada", "ada@b.com", "pw").await.unwrap();
        assert_eq!(identity.id, "new-user");
        assert_eq!(h.transport.calls(), 1);

        let request = h.transport.last_request();
        assert_eq!(request.url, format!("{}/auth/register", BASE_URL));
        assert_eq!(
            body_of(&request),
            json!({"name": "Ada", "email": "ada@b.com", "password": "pw"})
        );
    }

    #[tokio::test]
    async fn test_register_can_chain_into_login() {
        let h = Harness::with_policy(SessionPolicy {
            chain_login_after_register: true,
            ..SessionPolicy::default()
        });
        h.transport.push_json(200, json!({ "access_token": token_for("reg", NOW + 60) }));
        h.transport.push_json(200, json!({ "access_token": token_for("login", NOW + 60) }));

        let identity = h.session.register("Ada", "ada@b.com", "pw").await.unwrap();
        assert_eq!(identity.id, "login");
        let urls: Vec<String> = h.transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                format!("{}/auth/register", BASE_URL),
                format!("{}/auth/login", BASE_URL)
            ]
        );
    }

    #[tokio::test]
    async fn test_register_conflict_message() {
        let h = Harness::new();
        h.transport.push_json(409, json!({ "detail": "Email already registered" }));
        let err = h.session.register("Ada", "ada@b.com", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");

        h.transport.push_raw(400, "");
        let err = h.session.register("Ada", "ada@b.com", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Registration failed");
    }

    #[tokio::test]
    async fn test_logout_notifies_backend_with_bearer_and_clears() {
        let h = Harness::new();
        let token = token_for("1", NOW + 60);
        h.store.put(&token).unwrap();
        h.store.put_refresh_token("r").unwrap();
        h.transport.push_json(200, json!({}));

        h.session.logout().await;

        let request = h.transport.last_request();
        assert_eq!(request.url, format!("{}/auth/logout", BASE_URL));
        assert_eq!(
            request.headers.get(AUTHORIZATION).unwrap().to_str().unwrap(),
            format!("Bearer {}", token)
        );
        assert_eq!(h.store.raw(), None);
        assert_eq!(h.store.refresh_token(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_backend_fails() {
        let h = Harness::new();
        h.store.put(&token_for("1", NOW + 60)).unwrap();
        h.transport.push_error(TransportError::Timeout);

        h.session.logout().await;
        assert_eq!(h.store.raw(), None);
    }

    #[tokio::test]
    async fn test_logout_twice_is_harmless() {
        let h = Harness::new();
        h.store.put(&token_for("1", NOW + 60)).unwrap();
        h.transport.push_raw(500, "");

        h.session.logout().await;
        assert_eq!(h.store.raw(), None);
        h.session.logout().await;
        assert_eq!(h.store.raw(), None);
        // Second logout had no token, so the backend was not contacted.
        assert_eq!(h.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_events_follow_session_lifecycle() {
        let h = Harness::new();
        let mut events = h.session.subscribe();
        h.transport
            .push_json(200, json!({ "access_token": token_for("7", NOW + 60) }));

        let identity = h.session.login("a@b.com", "x").await.unwrap();
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedIn(identity));

        h.clock.advance(Duration::seconds(61));
        assert_eq!(h.session.identity(), None);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Invalidated);

        h.session.logout().await;
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
    }

    #[tokio::test]
    async fn test_expiry_accessors() {
        let h = Harness::new();
        h.store.put(&token_for("1", NOW + 120)).unwrap();

        assert_eq!(h.session.expires_at().unwrap().timestamp(), NOW + 120);
        assert_eq!(h.session.time_until_expiry(), Some(Duration::seconds(120)));
        assert!(h.session.needs_refresh());
        assert_eq!(h.session.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn test_refresh_session_always_requires_reauthentication() {
        let h = Harness::new();
        assert!(!h.session.refresh_session().await);
        h.store.put_refresh_token("r").unwrap();
        assert!(!h.session.refresh_session().await);
        assert_eq!(h.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_only_clears_when_enabled() {
        let h = Harness::new();
        h.store.put(&token_for("1", NOW + 60)).unwrap();
        h.session.handle_unauthorized();
        assert!(h.session.is_authenticated());

        let h = Harness::with_policy(SessionPolicy {
            logout_on_unauthorized: true,
            ..SessionPolicy::default()
        });
        h.store.put(&token_for("1", NOW + 60)).unwrap();
        h.session.handle_unauthorized();
        assert!(!h.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_unvalidated_reads_return_raw_token() {
        let h = Harness::with_policy(SessionPolicy {
            validate_on_read: false,
            ..SessionPolicy::default()
        });
        h.store.put(&token_for("1", NOW - 60)).unwrap();
        assert_eq!(h.session.valid_token(), Some(token_for("1", NOW - 60)));
        // Identity is always derived from a validated token.
        assert_eq!(h.session.identity(), None);
    }
}
