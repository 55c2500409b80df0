use axum::response::{IntoResponse, Response};
use http::StatusCode;

/// Rejection used when a handler asks for a [`Session`](crate::Session) on a
/// route that is not wrapped by [`with_session`](crate::with_session).
#[derive(Debug, Clone, Copy)]
pub struct SessionMissing;

impl IntoResponse for SessionMissing {
    fn into_response(self) -> Response {
        tracing::error!("Session requested but the session middleware is not installed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Session middleware is not installed",
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_missing_is_internal_error() {
        let response = SessionMissing.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
