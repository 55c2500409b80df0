use std::fmt;
use std::str::FromStr;

use crate::storage::errors::StorageError;

/// Which backend holds the session values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreType {
    #[default]
    Memory,
    Redis,
}

impl FromStr for StoreType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            t => Err(StorageError::Config(format!(
                "Unsupported cache store type: {t}. Supported types are 'memory' and 'redis'"
            ))),
        }
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Redis => f.write_str("redis"),
        }
    }
}
