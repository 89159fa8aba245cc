//! REST API layer: route handlers, DTOs, OpenAPI document, and router
//! composition.
//!
//! Topic endpoints are mounted under `/api/v1`; system endpoints and the
//! OpenAPI document live at the root.

pub mod dto;
pub mod handlers;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI description of the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "topic-relay", description = "WebSocket publish/subscribe relay"),
    paths(
        handlers::system::health_handler,
        handlers::system::stats_handler,
        handlers::topic::publish_handler,
        handlers::topic::broadcast_handler,
    ),
    tags(
        (name = "System", description = "Health and statistics"),
        (name = "Topics", description = "Server-side publishing"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/swagger.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::api::dto::{PublishResponse, StatsResponse};
    use crate::config::SessionConfig;
    use crate::domain::{Hub, Session};

    fn state() -> AppState {
        AppState {
            hub: Arc::new(Hub::new()),
            session: SessionConfig::default(),
            allowed_origins: Arc::from(Vec::new()),
        }
    }

    async fn call(state: &AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let app = build_router().with_state(state.clone());
        let Ok(response) = app.oneshot(request).await else {
            panic!("router failed");
        };
        let status = response.status();
        let Ok(body) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        (status, body.to_vec())
    }

    fn post_json(uri: &str, json: &str) -> Request<Body> {
        let Ok(request) = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
        else {
            panic!("invalid request");
        };
        request
    }

    #[tokio::test]
    async fn health_is_ok() {
        let Ok(request) = Request::get("/health").body(Body::empty()) else {
            panic!("invalid request");
        };
        let (status, _) = call(&state(), request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn publish_reaches_subscriber_queue() {
        let state = state();
        let (session, mut queue) = Session::new(4);
        state.hub.register(&session).await;
        state.hub.subscribe(&session, "news").await;

        let (status, body) = call(
            &state,
            post_json("/api/v1/topics/news/publish", r#"{"message":"hi"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let Ok(resp) = serde_json::from_slice::<PublishResponse>(&body) else {
            panic!("unexpected body");
        };
        assert_eq!(resp.delivered, 1);
        assert_eq!(resp.topic.as_deref(), Some("news"));
        assert_eq!(queue.try_recv().as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let (status, _) = call(&state(), post_json("/api/v1/broadcast", r#"{"message":""}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stats_reflect_hub() {
        let state = state();
        let (session, _queue) = Session::new(1);
        state.hub.register(&session).await;
        state.hub.subscribe(&session, "news").await;

        let Ok(request) = Request::get("/stats").body(Body::empty()) else {
            panic!("invalid request");
        };
        let (status, body) = call(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        let Ok(stats) = serde_json::from_slice::<StatsResponse>(&body) else {
            panic!("unexpected body");
        };
        assert_eq!((stats.sessions, stats.topics), (1, 1));
    }

    #[test]
    fn openapi_lists_topic_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/topics/{topic}/publish"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
