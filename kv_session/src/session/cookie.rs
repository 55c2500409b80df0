use chrono::{DateTime, Utc};
use http::header::{HeaderMap, HeaderValue, SET_COOKIE};

use crate::config::SessionConfig;
use crate::session::errors::SessionError;

const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn append(headers: &mut HeaderMap, cookie: String) -> Result<(), SessionError> {
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| SessionError::Cookie(format!("Failed to build cookie header: {e}")))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

pub(super) fn header_set_cookie(
    headers: &mut HeaderMap,
    config: &SessionConfig,
    value: &str,
    expires_at: DateTime<Utc>,
    max_age: i64,
) -> Result<(), SessionError> {
    let mut cookie = format!(
        "{}={}; Expires={}; Max-Age={}; Path={}; HttpOnly",
        config.cookie_name,
        value,
        http_date(expires_at),
        max_age,
        config.cookie_path
    );
    if let Some(domain) = &config.cookie_domain {
        cookie.push_str(&format!("; Domain={domain}"));
    }
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    if let Some(same_site) = config.cookie_same_site {
        cookie.push_str(&format!("; SameSite={same_site}"));
    }

    tracing::trace!("Set-Cookie: {}", cookie);
    append(headers, cookie)
}

pub(super) fn header_clear_cookie(
    headers: &mut HeaderMap,
    config: &SessionConfig,
) -> Result<(), SessionError> {
    let mut cookie = format!(
        "{}=; Expires={}; Max-Age=0; Path={}",
        config.cookie_name, EXPIRED, config.cookie_path
    );
    if let Some(domain) = &config.cookie_domain {
        cookie.push_str(&format!("; Domain={domain}"));
    }

    append(headers, cookie)
}
