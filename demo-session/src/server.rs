use axum::Router;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub(crate) const DEFAULT_HOST: &str = "127.0.0.1";
pub(crate) const DEFAULT_PORT: u16 = 5000;

pub(crate) fn listen_port() -> u16 {
    match std::env::var("SESSION_EXAMPLE_PORT") {
        Ok(port) => port.trim().parse().unwrap_or_else(|_| {
            tracing::error!("Port argument must be an integer, using {}", DEFAULT_PORT);
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    }
}

pub(crate) fn listen_host() -> String {
    std::env::var("SESSION_EXAMPLE_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string())
}

pub(crate) async fn serve(
    host: &str,
    port: u16,
    app: Router,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| format!("{host} did not resolve to any address"))?;

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

pub(crate) fn init_tracing(app_name: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        #[cfg(debug_assertions)]
        {
            format!("kv_session_axum=trace,kv_session=trace,{app_name}=trace,info").into()
        }

        #[cfg(not(debug_assertions))]
        {
            "info".into()
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    #[cfg(debug_assertions)]
    tracing::info!("Debug mode enabled - showing detailed logs by default");
    tracing::info!("You can increase verbosity by setting the RUST_LOG environment variable.");
}
