use chrono::{DateTime, Duration, Utc};
use http::HeaderMap;
use std::fmt;
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::session::codec;
use crate::session::cookie::{header_clear_cookie, header_set_cookie};
use crate::session::errors::SessionError;
use crate::session::identity::{self, RequestView};
use crate::session::record::SessionRecord;
use crate::storage::{CacheStore, build_cache_store};

/// How a record left the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The data was handed to the store (`persisted` is false when the
    /// write failed) and a cookie was possibly issued.
    Saved { persisted: bool, cookie_issued: bool },
    /// The record was empty or deleted; its key was dropped from the store.
    Purged { cookie_cleared: bool },
    /// The record expired before it could be saved. Nothing was touched.
    ExpiredNoOp,
}

/// Opens and saves sessions against a [`CacheStore`].
///
/// Holds only configuration and the store handle, so one manager can be
/// cloned into every request handler. Store failures never surface to the
/// caller: reads degrade to a fresh session and writes or deletes are
/// logged and dropped.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn CacheStore>,
    config: Arc<SessionConfig>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(store: Arc<dyn CacheStore>, config: SessionConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Build the store named by `config` and wrap it in a manager.
    pub async fn from_config(config: SessionConfig) -> Result<Self, SessionError> {
        let store = build_cache_store(config.store_type, &config.store_urls).await?;
        Ok(Self::new(store, config))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn store_key(&self, session_id: &str) -> String {
        format!("{}{}", self.config.cache_key_prefix, session_id)
    }

    fn generate_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// The session id carried by `request`, if any.
    pub fn resolve_identity(&self, request: &RequestView<'_>) -> Option<String> {
        identity::resolve_identity(request, &self.config.cookie_name, &self.config.token_header)
    }

    /// False for clients presenting a token header or a JSON `token` field.
    pub fn needs_cookie(&self, request: &RequestView<'_>) -> bool {
        identity::needs_cookie(request, &self.config.token_header)
    }

    /// Load the session `request` refers to, or start a new one.
    #[tracing::instrument(skip_all)]
    pub async fn open(&self, request: &RequestView<'_>) -> SessionRecord {
        let needs_cookie = self.needs_cookie(request);

        let Some(session_id) = self.resolve_identity(request) else {
            let session_id = Self::generate_session_id();
            tracing::debug!("No session identity in request, starting {}", session_id);
            return SessionRecord::generated(session_id, needs_cookie);
        };

        let key = self.store_key(&session_id);
        let stored = match self.store.get(&key).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!("Session store read failed for {}: {}", key, e);
                None
            }
        };

        let Some(bytes) = stored else {
            tracing::debug!("Session {} not in store, starting fresh", session_id);
            return SessionRecord::new(session_id, needs_cookie);
        };

        match codec::decode(&bytes) {
            Ok((data, valid_until)) => {
                tracing::debug!("Loaded session {} with {} keys", session_id, data.len());
                SessionRecord::existing(session_id, data, valid_until, needs_cookie)
            }
            Err(e) => {
                tracing::warn!("Discarding undecodable session value for {}: {}", key, e);
                SessionRecord::new(session_id, needs_cookie)
            }
        }
    }

    /// When `record` should expire if it were saved right now.
    pub fn expiration_time(&self, record: &SessionRecord) -> DateTime<Utc> {
        self.expiration_at(record, Utc::now())
    }

    fn expiration_at(&self, record: &SessionRecord, now: DateTime<Utc>) -> DateTime<Utc> {
        record.valid_until().unwrap_or_else(|| {
            i64::try_from(self.config.cookie_expiry_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }

    /// Persist or purge `record` and append any cookie change to `headers`.
    #[tracing::instrument(skip_all, fields(session_id = %record.id()))]
    pub async fn save(&self, record: SessionRecord, headers: &mut HeaderMap) -> SaveOutcome {
        let key = self.store_key(record.id());

        if record.is_empty() || record.is_deleted() {
            if record.is_generated() {
                tracing::debug!("Dropping session that was never stored");
            } else if let Err(e) = self.store.remove(&key).await {
                tracing::error!("Session store delete failed for {}: {}", key, e);
            }

            let cookie_cleared = record.is_modified() && self.clear_cookie(headers);
            return SaveOutcome::Purged { cookie_cleared };
        }

        let now = Utc::now();
        let expires_at = self.expiration_at(&record, now);
        let ttl = expires_at.signed_duration_since(now).num_seconds();
        if ttl <= 0 {
            tracing::debug!("Session expired at {}, not saving", expires_at);
            return SaveOutcome::ExpiredNoOp;
        }

        let persisted = match codec::encode(record.data(), record.valid_until()) {
            Ok(bytes) => match self.store.put_with_ttl(&key, bytes, ttl as u64).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("Session store write failed for {}: {}", key, e);
                    false
                }
            },
            Err(e) => {
                tracing::error!("Failed to encode session {}: {}", key, e);
                false
            }
        };

        let cookie_issued = record.needs_cookie_delivery()
            && match header_set_cookie(headers, &self.config, record.id(), expires_at, ttl) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("Failed to set session cookie: {}", e);
                    false
                }
            };

        SaveOutcome::Saved {
            persisted,
            cookie_issued,
        }
    }

    fn clear_cookie(&self, headers: &mut HeaderMap) -> bool {
        match header_clear_cookie(headers, &self.config) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to clear session cookie: {}", e);
                false
            }
        }
    }
}
