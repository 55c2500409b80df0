mod codec;
mod cookie;
mod errors;
mod identity;
mod manager;
mod record;

#[cfg(test)]
mod test_utils;

pub use errors::SessionError;
pub use identity::{RequestView, derive_session_id};
pub use manager::{SaveOutcome, SessionManager};
pub use record::SessionRecord;
