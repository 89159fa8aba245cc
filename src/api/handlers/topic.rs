//! Server-side publish and broadcast handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{PublishRequest, PublishResponse};
use crate::app_state::AppState;
use crate::error::RelayError;

/// `POST /topics/{topic}/publish` — Relay a message to a topic.
///
/// # Errors
///
/// Returns [`RelayError::InvalidRequest`] if the message is empty.
#[utoipa::path(
    post,
    path = "/api/v1/topics/{topic}/publish",
    tag = "Topics",
    summary = "Publish to a topic",
    description = "Queues the message for every current subscriber of the topic. \
                   Subscribers whose outbound queue is full are disconnected.",
    params(("topic" = String, Path, description = "Topic name")),
    request_body = PublishRequest,
    responses(
        (status = 200, description = "Fan-out report", body = PublishResponse),
        (status = 400, description = "Empty message"),
    )
)]
pub async fn publish_handler(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    Json(req): Json<PublishRequest>,
) -> Result<impl IntoResponse, RelayError> {
    req.validate()?;
    let report = state.hub.publish(&topic, Arc::from(req.message)).await;
    tracing::debug!(topic = %topic, delivered = report.delivered, "published via api");
    Ok(Json(PublishResponse::new(Some(topic), report)))
}

/// `POST /broadcast` — Relay a message to every session.
///
/// # Errors
///
/// Returns [`RelayError::InvalidRequest`] if the message is empty.
#[utoipa::path(
    post,
    path = "/api/v1/broadcast",
    tag = "Topics",
    summary = "Broadcast to all sessions",
    description = "Queues the message for every connected session regardless of subscriptions.",
    request_body = PublishRequest,
    responses(
        (status = 200, description = "Fan-out report", body = PublishResponse),
        (status = 400, description = "Empty message"),
    )
)]
pub async fn broadcast_handler(
    State(state): State<AppState>,
    Json(req): Json<PublishRequest>,
) -> Result<impl IntoResponse, RelayError> {
    req.validate()?;
    let report = state.hub.broadcast(Arc::from(req.message)).await;
    Ok(Json(PublishResponse::new(None, report)))
}

/// Topic routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/topics/{topic}/publish", post(publish_handler))
        .route("/broadcast", post(broadcast_handler))
}
