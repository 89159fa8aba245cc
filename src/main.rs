//! topic-relay server entry point.
//!
//! Starts the Axum HTTP server with the WebSocket relay and REST endpoints.

use tracing_subscriber::EnvFilter;

use topic_relay::app_state::AppState;
use topic_relay::config::RelayConfig;
use topic_relay::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = RelayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        addr = %config.listen_addr,
        ws_path = %config.ws_path,
        queue_capacity = config.session.outbound_capacity,
        "starting topic-relay"
    );

    let state = AppState::new(&config);
    let app = server::build_app(state, &config.ws_path);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    server::serve(listener, app, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutting down");
    })
    .await?;

    Ok(())
}
