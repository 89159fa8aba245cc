//! HTTP server assembly.
//!
//! [`build_app`] wires the WebSocket endpoint and the REST router around
//! one [`AppState`]; [`serve`] binds it to a listener.

use std::net::SocketAddr;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the full application router.
pub fn build_app(state: AppState, ws_path: &str) -> Router {
    Router::new()
        .merge(api::build_router())
        .route(ws_path, get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves `app` on `listener` until `shutdown` resolves.
///
/// Peer addresses are exposed to handlers through `ConnectInfo`.
///
/// # Errors
///
/// Returns the underlying I/O error if the server fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
