use axum::extract::DefaultBodyLimit;
use cndocs_backend::{
    config::{get_config, init_config},
    middleware::cors::quiz_cors,
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let app_state = AppState::new(config)?;

    {
        let sessions = app_state.sessions.clone();
        let ttl = Duration::from_secs(config.session_ttl_minutes * 60);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
                let swept = sessions.sweep_idle(ttl).await;
                if swept > 0 {
                    info!(swept, remaining = sessions.len(), "Closed idle quiz sessions");
                }
            }
        });
    }

    let app = routes::router(app_state, config.public_rps)
        .layer(quiz_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
