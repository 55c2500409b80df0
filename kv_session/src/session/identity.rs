use headers::HeaderMapExt;
use http::HeaderMap;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

const BODY_TOKEN_FIELD: &str = "token";

/// What the session layer gets to see of an incoming request.
///
/// `body` should only be supplied when the request declared a JSON content
/// type; anything that is not a JSON object is read as "no token".
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    pub headers: &'a HeaderMap,
    pub body: Option<&'a [u8]>,
}

impl<'a> RequestView<'a> {
    pub fn new(headers: &'a HeaderMap) -> Self {
        Self {
            headers,
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: &'a [u8]) -> Self {
        self.body = Some(body);
        self
    }

    fn json_object(&self) -> Option<Map<String, Value>> {
        let body = self.body?;
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(object)) => Some(object),
            Ok(_) => None,
            Err(e) => {
                tracing::trace!("Request body is not usable JSON: {}", e);
                None
            }
        }
    }
}

/// Map an opaque token onto a fixed-length session id.
///
/// Unsalted on purpose: everyone presenting the same token shares the same
/// session. This is key derivation, not authentication.
pub fn derive_session_id(token: &[u8]) -> String {
    format!("{:x}", Sha256::digest(token))
}

/// Resolve the session id a request carries, if any.
///
/// Precedence: the session cookie verbatim, then the token header hashed,
/// then a string `token` field of a JSON object body hashed.
pub(crate) fn resolve_identity(
    request: &RequestView<'_>,
    cookie_name: &str,
    token_header: &str,
) -> Option<String> {
    if let Some(cookie) = request.headers.typed_get::<headers::Cookie>() {
        if let Some(id) = cookie.get(cookie_name).filter(|v| !v.is_empty()) {
            tracing::debug!("Session id taken from cookie {}", cookie_name);
            return Some(id.to_string());
        }
    }

    if let Some(value) = request.headers.get(token_header) {
        tracing::debug!("Session id derived from header {}", token_header);
        return Some(derive_session_id(value.as_bytes()));
    }

    let object = request.json_object()?;
    match object.get(BODY_TOKEN_FIELD) {
        Some(Value::String(token)) => {
            tracing::debug!("Session id derived from JSON body token");
            Some(derive_session_id(token.as_bytes()))
        }
        _ => None,
    }
}

/// Whether the client looks like a browser rather than a token-carrying API client.
pub(crate) fn needs_cookie(request: &RequestView<'_>, token_header: &str) -> bool {
    if request.headers.contains_key(token_header) {
        return false;
    }

    !request
        .json_object()
        .is_some_and(|object| object.contains_key(BODY_TOKEN_FIELD))
}
