//! Session configuration
//!
//! Every option has a default and can be overridden either through the
//! `with_*` builder methods or through environment variables read by
//! [`SessionConfig::from_env`].

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::session::SessionError;
use crate::storage::StoreType;

pub const DEFAULT_COOKIE_EXPIRY_SECS: u64 = 36000;
/// Upper bound on the session lifetime: the 400 day cap browsers apply to cookies.
pub const MAX_COOKIE_EXPIRY_SECS: u64 = 400 * 24 * 60 * 60;
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "session_";
pub const DEFAULT_TOKEN_HEADER: &str = "X-Auth-Token";
pub const DEFAULT_COOKIE_NAME: &str = "session";
pub const DEFAULT_STORE_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// `SameSite` attribute of the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl FromStr for SameSite {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lax" => Ok(Self::Lax),
            "strict" => Ok(Self::Strict),
            "none" => Ok(Self::None),
            other => Err(SessionError::Config(format!("invalid SameSite value: {other}"))),
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lax => f.write_str("Lax"),
            Self::Strict => f.write_str("Strict"),
            Self::None => f.write_str("None"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) store_type: StoreType,
    pub(crate) store_urls: Vec<String>,
    pub(crate) cookie_expiry_secs: u64,
    pub(crate) cache_key_prefix: String,
    pub(crate) token_header: String,
    pub(crate) cookie_name: String,
    pub(crate) cookie_domain: Option<String>,
    pub(crate) cookie_path: String,
    pub(crate) cookie_secure: bool,
    pub(crate) cookie_same_site: Option<SameSite>,
    pub(crate) max_body_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::Memory,
            store_urls: vec![DEFAULT_STORE_URL.to_string()],
            cookie_expiry_secs: DEFAULT_COOKIE_EXPIRY_SECS,
            cache_key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_domain: None,
            cookie_path: "/".to_string(),
            cookie_secure: false,
            cookie_same_site: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl SessionConfig {
    /// Load configuration from `SESSION_*` environment variables.
    ///
    /// Unset variables keep their defaults. Values that cannot be parsed are
    /// logged and also fall back to the default. An unknown store type is
    /// the only hard error since no sensible backend can be picked for it.
    pub fn from_env() -> Result<Self, SessionError> {
        let mut config = Self::default();

        if let Some(store_type) = env_string("SESSION_STORE_TYPE") {
            config.store_type = store_type.parse()?;
        }
        if let Some(urls) = env_string("SESSION_STORE_URL") {
            let urls: Vec<String> = urls
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect();
            if !urls.is_empty() {
                config.store_urls = urls;
            }
        }
        config.cookie_expiry_secs = env_parsed("SESSION_COOKIE_EXPIRES")
            .filter(|secs| {
                let in_range = expiry_in_range(*secs);
                if !in_range {
                    tracing::warn!(
                        "Ignoring SESSION_COOKIE_EXPIRES={}, must be between 1 and {}",
                        secs,
                        MAX_COOKIE_EXPIRY_SECS
                    );
                }
                in_range
            })
            .unwrap_or(config.cookie_expiry_secs);
        if let Some(prefix) = env_string("SESSION_CACHE_KEY_PREFIX") {
            config.cache_key_prefix = prefix;
        }
        if let Some(header) = env_string("SESSION_TOKEN_HEADER") {
            config.token_header = header;
        }
        if let Some(name) = env_string("SESSION_COOKIE_NAME") {
            config.cookie_name = name;
        }
        config.cookie_domain = env_string("SESSION_COOKIE_DOMAIN");
        if let Some(path) = env_string("SESSION_COOKIE_PATH") {
            config.cookie_path = path;
        }
        config.cookie_secure = env_parsed("SESSION_COOKIE_SECURE").unwrap_or(config.cookie_secure);
        config.cookie_same_site = env_parsed("SESSION_COOKIE_SAMESITE");
        config.max_body_bytes =
            env_parsed("SESSION_MAX_BODY_BYTES").unwrap_or(config.max_body_bytes);

        tracing::debug!("Loaded session config: {:?}", config);
        Ok(config)
    }

    #[must_use]
    pub fn with_store_type(mut self, store_type: StoreType) -> Self {
        self.store_type = store_type;
        self
    }

    #[must_use]
    pub fn with_store_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Values outside `1..=MAX_COOKIE_EXPIRY_SECS` are clamped into range.
    #[must_use]
    pub fn with_cookie_expiry_secs(mut self, secs: u64) -> Self {
        if !expiry_in_range(secs) {
            tracing::warn!(
                "Cookie expiry of {} seconds is out of range, clamping to 1..={}",
                secs,
                MAX_COOKIE_EXPIRY_SECS
            );
        }
        self.cookie_expiry_secs = secs.clamp(1, MAX_COOKIE_EXPIRY_SECS);
        self
    }

    #[must_use]
    pub fn with_cache_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_key_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_token_header(mut self, header: impl Into<String>) -> Self {
        self.token_header = header.into();
        self
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_cookie_path(mut self, path: impl Into<String>) -> Self {
        self.cookie_path = path.into();
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_cookie_same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_same_site = Some(same_site);
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn store_type(&self) -> StoreType {
        self.store_type
    }

    pub fn store_urls(&self) -> &[String] {
        &self.store_urls
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn token_header(&self) -> &str {
        &self.token_header
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

fn expiry_in_range(secs: u64) -> bool {
    (1..=MAX_COOKIE_EXPIRY_SECS).contains(&secs)
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
