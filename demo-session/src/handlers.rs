use axum::{extract::Request, middleware::Next, response::Response};
use kv_session_axum::Session;

pub(crate) const IDENTIFIER_KEY: &str = "identifier";

/// Give every session an identifier before the route runs.
pub(crate) async fn ensure_identifier(session: Session, req: Request, next: Next) -> Response {
    if session.get::<String>(IDENTIFIER_KEY).await.is_none() {
        tracing::info!("Previously unseen session... Setting identifier");
        let identifier = uuid::Uuid::new_v4().to_string();
        if let Err(e) = session.insert(IDENTIFIER_KEY, identifier).await {
            tracing::error!("Failed to store identifier: {}", e);
        }
    }
    next.run(req).await
}

pub(crate) async fn index(session: Session) -> String {
    let identifier = session
        .get::<String>(IDENTIFIER_KEY)
        .await
        .unwrap_or_else(|| "Not set".to_string());
    format!("The random identifier stored with your session is: {identifier}")
}
