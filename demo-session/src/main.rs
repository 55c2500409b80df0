use axum::{Router, middleware, routing::get};
use kv_session_axum::{SessionManager, with_session};

mod handlers;
mod server;

use crate::handlers::{ensure_identifier, index};
use crate::server::{init_tracing, listen_host, listen_port, serve};

fn app(manager: SessionManager) -> Router {
    Router::new()
        .route("/", get(index).post(index))
        .layer(middleware::from_fn(ensure_identifier))
        .layer(middleware::from_fn_with_state(manager, with_session))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing(env!("CARGO_CRATE_NAME"));

    let manager = kv_session_axum::init().await?;
    tracing::debug!("Session manager ready: {:?}", manager);

    serve(&listen_host(), listen_port(), app(manager)).await
}
