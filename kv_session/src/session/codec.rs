//! Stored value format: `{"data":{...},"valid_until":<unix secs>}`.
//!
//! Keys are emitted in sorted order, so equal data always encodes to equal
//! bytes. `valid_until` sits next to the data rather than inside it, so an
//! application may use any key name, `"valid_until"` included.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::errors::SessionError;

#[derive(Serialize)]
struct StoredSessionRef<'a> {
    data: &'a Map<String, Value>,
    #[serde(
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    valid_until: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct StoredSession {
    data: Map<String, Value>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    valid_until: Option<DateTime<Utc>>,
}

pub(crate) fn encode(
    data: &Map<String, Value>,
    valid_until: Option<DateTime<Utc>>,
) -> Result<Vec<u8>, SessionError> {
    Ok(serde_json::to_vec(&StoredSessionRef { data, valid_until })?)
}

pub(crate) fn decode(
    bytes: &[u8],
) -> Result<(Map<String, Value>, Option<DateTime<Utc>>), SessionError> {
    let stored: StoredSession = serde_json::from_slice(bytes)?;
    Ok((stored.data, stored.valid_until))
}
