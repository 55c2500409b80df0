mod error;
mod middleware;
mod session;

pub use error::SessionMissing;
pub use middleware::with_session;
pub use session::Session;

// Re-export the core types so applications only need this crate
pub use kv_session::{
    CacheStore, InMemoryCacheStore, RedisCacheStore, SameSite, SaveOutcome, SessionConfig,
    SessionError, SessionManager, SessionRecord, StorageError, StoreType, init,
};
