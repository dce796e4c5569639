//! Test doubles shared by the unit tests: a scripted HTTP transport, a
//! storage wrapper that counts removals, and token fixtures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::api::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::auth::storage::{MemoryStorage, TokenStorage};
use crate::auth::token::encode_unsigned;
use crate::auth::validator::{FixedClock, SessionValidator};
use crate::auth::{CredentialStore, SessionManager, SessionPolicy, StorageError};

/// Fixed "current time" used across tests.
pub const NOW: i64 = 1_750_000_000;

pub const BASE_URL: &str = "https://api.example.test/api";

pub fn token_for(sub: &str, exp: i64) -> String {
    encode_unsigned(&json!({"sub": sub, "exp": exp})).unwrap()
}

/// Transport that replays scripted responses in order and records requests.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.push_raw(status, serde_json::to_vec(&body).unwrap())
    }

    pub fn push_raw(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        let status = StatusCode::from_u16(status).unwrap();
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    pub fn push_error(&self, error: TransportError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connection("no scripted response".into())))
    }
}

/// Memory storage that counts `remove` calls.
#[derive(Default)]
pub struct CountingStorage {
    inner: MemoryStorage,
    removals: AtomicUsize,
}

impl CountingStorage {
    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.get(key).unwrap()
    }
}

impl TokenStorage for CountingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key)
    }
}

/// Memory storage whose writes to one key always fail.
pub struct FailingStorage {
    inner: MemoryStorage,
    failing_key: &'static str,
}

impl FailingStorage {
    pub fn new(failing_key: &'static str) -> Self {
        Self {
            inner: MemoryStorage::new(),
            failing_key,
        }
    }

    fn check(&self, key: &str) -> Result<(), StorageError> {
        if key == self.failing_key {
            return Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into());
        }
        Ok(())
    }
}

impl TokenStorage for FailingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check(key)?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check(key)?;
        self.inner.remove(key)
    }
}

/// A session manager wired to a mock transport, memory storage and a fixed clock.
pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub clock: Arc<FixedClock>,
    pub store: Arc<CredentialStore>,
    pub session: Arc<SessionManager>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(SessionPolicy::default())
    }

    pub fn with_policy(policy: SessionPolicy) -> Self {
        Self::with_storage(policy, Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(policy: SessionPolicy, storage: Arc<dyn TokenStorage>) -> Self {
        let transport = Arc::new(MockTransport::new());
        let clock = Arc::new(FixedClock::new(Utc.timestamp_opt(NOW, 0).unwrap()));
        let validator = SessionValidator::new(clock.clone(), policy.missing_expiry);
        let store = Arc::new(CredentialStore::new(storage, validator));
        let session = Arc::new(SessionManager::new(
            transport.clone(),
            BASE_URL,
            store.clone(),
            policy,
        ));
        Self {
            transport,
            clock,
            store,
            session,
        }
    }
}
