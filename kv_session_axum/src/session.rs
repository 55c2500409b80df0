use axum::extract::FromRequestParts;
use http::request::Parts;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use kv_session::{SessionError, SessionRecord};

use super::error::SessionMissing;

/// The current request's session, available as an Axum extractor
///
/// Handed to handlers by [`with_session`](crate::with_session). The record
/// belongs to this request only; after the handler returns the middleware
/// takes it back and saves it.
///
/// # Example
///
/// ```no_run
/// use axum::{Router, middleware, routing::get};
/// use kv_session_axum::{InMemoryCacheStore, Session, SessionConfig, SessionManager, with_session};
/// use std::sync::Arc;
///
/// async fn visits(session: Session) -> String {
///     let count = session.get::<u64>("visits").await.unwrap_or(0) + 1;
///     session.insert("visits", count).await.ok();
///     format!("visit number {count}")
/// }
///
/// let manager = SessionManager::new(Arc::new(InMemoryCacheStore::new()), SessionConfig::default());
/// let app: Router = Router::new()
///     .route("/", get(visits))
///     .layer(middleware::from_fn_with_state(manager, with_session));
/// ```
#[derive(Clone, Debug)]
pub struct Session {
    record: Arc<Mutex<SessionRecord>>,
}

impl Session {
    pub(crate) fn new(record: SessionRecord) -> Self {
        Self {
            record: Arc::new(Mutex::new(record)),
        }
    }

    /// Take the record back once the handler is done with it.
    pub(crate) async fn into_record(self) -> SessionRecord {
        match Arc::try_unwrap(self.record) {
            Ok(record) => record.into_inner(),
            // A handler kept a clone alive (e.g. in a spawned task); save a snapshot.
            Err(shared) => shared.lock().await.clone(),
        }
    }

    /// Direct access to the record for anything the shortcuts below do not cover.
    pub async fn lock(&self) -> MutexGuard<'_, SessionRecord> {
        self.record.lock().await
    }

    pub async fn id(&self) -> String {
        self.record.lock().await.id().to_string()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.record.lock().await.get(key)
    }

    pub async fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<(), SessionError> {
        self.record.lock().await.insert(key, value)
    }

    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.record.lock().await.remove(key)
    }

    /// Destroy the session when the response is sent.
    pub async fn delete(&self) {
        self.record.lock().await.delete();
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = SessionMissing;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or(SessionMissing)
    }
}
