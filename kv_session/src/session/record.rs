use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::session::errors::SessionError;

/// One request's view of a session: its key/value data plus bookkeeping.
///
/// A record is owned by the request that opened it. Every mutating method
/// marks it modified, which is what `SessionManager::save` looks at when it
/// decides whether a purged session also needs its cookie cleared.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    id: String,
    data: Map<String, Value>,
    is_new: bool,
    is_generated: bool,
    is_modified: bool,
    is_deleted: bool,
    needs_cookie_delivery: bool,
    valid_until: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// A session the request named but the store could not supply.
    pub(crate) fn new(id: String, needs_cookie_delivery: bool) -> Self {
        debug_assert!(!id.is_empty(), "session id must not be empty");
        Self {
            id,
            data: Map::new(),
            is_new: true,
            is_generated: false,
            is_modified: false,
            is_deleted: false,
            needs_cookie_delivery,
            valid_until: None,
        }
    }

    /// A session under an id minted for this request. No store key can exist for it.
    pub(crate) fn generated(id: String, needs_cookie_delivery: bool) -> Self {
        Self {
            is_generated: true,
            ..Self::new(id, needs_cookie_delivery)
        }
    }

    /// A session loaded from the store.
    pub(crate) fn existing(
        id: String,
        data: Map<String, Value>,
        valid_until: Option<DateTime<Utc>>,
        needs_cookie_delivery: bool,
    ) -> Self {
        Self {
            id,
            data,
            is_new: false,
            is_generated: false,
            is_modified: false,
            is_deleted: false,
            needs_cookie_delivery,
            valid_until,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// True when the id was created by this request rather than presented by it.
    pub fn is_generated(&self) -> bool {
        self.is_generated
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// Whether the response should carry the session cookie.
    pub fn needs_cookie_delivery(&self) -> bool {
        self.needs_cookie_delivery
    }

    pub fn valid_until(&self) -> Option<DateTime<Utc>> {
        self.valid_until
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Deserialize the value under `key`. `None` when absent or of another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.data.get(key)?;
        match T::deserialize(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!("Session value {} has an unexpected shape: {}", key, e);
                None
            }
        }
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        self.insert_value(key, value);
        Ok(())
    }

    /// Insert `value`, returning what was stored under `key` before.
    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.is_modified = true;
        self.data.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.is_modified = true;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.is_modified = true;
        self.data.clear();
    }

    /// Request destruction of the session when it is saved.
    pub fn delete(&mut self) {
        self.is_deleted = true;
    }

    /// Override the default lifetime with an absolute expiry.
    pub fn set_valid_until(&mut self, valid_until: DateTime<Utc>) {
        self.is_modified = true;
        self.valid_until = Some(valid_until);
    }

    pub fn clear_valid_until(&mut self) {
        if self.valid_until.take().is_some() {
            self.is_modified = true;
        }
    }
}
