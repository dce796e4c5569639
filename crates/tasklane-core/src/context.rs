//! Wiring of the session components, built once at startup and shared.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use tracing::debug;

use crate::api::{ApiClient, HttpTransport, ReqwestTransport};
use crate::auth::{Clock, CredentialStore, SessionManager, SessionValidator, SystemClock, TokenStorage};
use crate::config::Config;

/// Everything a front-end needs: the session manager and an API client bound to it.
#[derive(Clone)]
pub struct AppContext {
    pub session: Arc<SessionManager>,
    pub api: ApiClient,
}

impl AppContext {
    /// Build production components from `config`: reqwest transport, the
    /// configured storage backend scoped to the API origin, and the system clock.
    pub fn from_config(config: &Config) -> Result<Self> {
        let origin = config.origin()?;
        let storage = config.storage.open(&origin, &config.cache_dir()?);
        let transport = ReqwestTransport::new(config.request_timeout())
            .context("Failed to build HTTP client")?;
        debug!(%origin, storage = ?config.storage, "Session components configured");

        Ok(Self::assemble(
            Arc::new(transport),
            storage,
            Arc::new(SystemClock),
            config,
        ))
    }

    pub fn assemble(
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn TokenStorage>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        let policy = config.session.clone();
        let validator = SessionValidator::new(clock, policy.missing_expiry)
            .with_refresh_buffer(Duration::seconds(policy.refresh_buffer_secs));
        let store = Arc::new(CredentialStore::new(storage, validator));
        let session = Arc::new(SessionManager::new(
            transport.clone(),
            config.api_base_url.clone(),
            store,
            policy,
        ));
        let api = ApiClient::new(transport, session.clone(), config.api_base_url.clone());
        Self { session, api }
    }
}
