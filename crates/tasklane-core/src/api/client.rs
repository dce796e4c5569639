//! Authenticated request wrapper for the task backend.
//!
//! Every data call goes through [`ApiClient::request`], which refuses to
//! send anything that needs a credential unless the session holds a valid
//! token.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::transport::{HttpRequest, HttpTransport, TransportError};
use super::ApiError;
use crate::auth::SessionManager;
use crate::models::UserProfile;

pub const PROFILE_PATH: &str = "/auth/profile";

/// Per-call options. Caller headers override the defaults on collision.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self {
            body: Some(body),
            ..Self::default()
        })
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// API client for the task backend.
/// Clone is cheap - transport and session are shared behind `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionManager>,
    base_url: String,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionManager>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            session,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    fn url(&self, path: &str, query: &[(String, String)]) -> Result<String, ApiError> {
        let raw = format!("{}{}", self.base_url, path);
        if query.is_empty() {
            return Ok(raw);
        }
        let url = Url::parse_with_params(&raw, query)
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {}", raw, e)))?;
        Ok(url.into())
    }

    /// Send a request to `path`.
    ///
    /// With `require_auth`, fails with [`ApiError::AuthenticationRequired`]
    /// before any I/O when no valid token is stored. Without it, a token is
    /// still attached when one is available.
    ///
    /// Non-2xx answers become [`ApiError::Rejected`]; 204 and empty bodies
    /// resolve to an empty object. Nothing is retried.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
        require_auth: bool,
    ) -> Result<Value, ApiError> {
        let token = self.session.valid_token();
        if require_auth && token.is_none() {
            warn!(path, "Authentication required but no token available");
            return Err(ApiError::AuthenticationRequired);
        }

        let mut request = HttpRequest::new(method, self.url(path, &options.query)?);
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(ref token) = token {
            request.bearer_auth(token)?;
        }
        for (name, value) in options.headers.iter() {
            request.headers.insert(name.clone(), value.clone());
        }
        if let Some(ref body) = options.body {
            request.body = Some(
                serde_json::to_vec(body)
                    .map_err(|e| TransportError::InvalidRequest(e.to_string()))?,
            );
        }

        debug!(method = %request.method, path, "API request");
        let response = self.transport.send(request).await?;

        if response.status == StatusCode::NO_CONTENT {
            return Ok(Value::Object(Map::new()));
        }

        if !response.status.is_success() {
            if response.status == StatusCode::UNAUTHORIZED {
                self.session.handle_unauthorized();
            }
            return Err(ApiError::from_status(response.status, &response.body));
        }

        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Object(Map::new()));
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            ApiError::InvalidResponse(format!(
                "{} ({})",
                e,
                ApiError::truncate_body(&response.body)
            ))
        })
    }

    fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
        serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// Authenticated GET decoded into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T, ApiError> {
        let options = RequestOptions {
            query,
            ..RequestOptions::default()
        };
        Self::decode(self.request(Method::GET, path, options, true).await?)
    }

    /// Authenticated call with a JSON body, decoded into `T`.
    pub async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let options = RequestOptions::json(body)?;
        Self::decode(self.request(method, path, options, true).await?)
    }

    /// Authenticated call without a body, decoded into `T`.
    pub async fn call<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, ApiError> {
        Self::decode(
            self.request(method, path, RequestOptions::default(), true)
                .await?,
        )
    }

    /// Profile of the signed-in user as the backend sees it.
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.get_json(PROFILE_PATH, Vec::new()).await
    }
}
