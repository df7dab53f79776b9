//! HTTP Routes
//!
//! Endpoints:
//! - /__cache/ws        WS    缓存控制通道（Prefetch / AbortLoads / Ping）
//! - /__cache/health    GET   存活检查
//! - /__cache/status    GET   引擎统计 + 队列快照
//! - /__cache/delete    POST  删除已缓存的音频
//! - 其他所有请求                交给 RequestRouter

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/__cache", control_routes())
        .fallback(handlers::proxy)
}

/// 缓存控制路由
fn control_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(handlers::cache_websocket_handler))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::cache_status))
        .route("/delete", post(handlers::delete_entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{
        AudioCacheConfig, AudioCacheEngine, NetworkFirstCache, RequestRouter, StaticAssetCache,
    };
    use crate::infrastructure::adapters::FakeUpstream;
    use crate::infrastructure::events::MessageBroker;
    use crate::infrastructure::memory::InMemoryCacheStore;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tokio::sync::mpsc;
    use tower::util::ServiceExt;

    fn create_test_app() -> (Router, Arc<FakeUpstream>) {
        let upstream = Arc::new(FakeUpstream::new());
        let store = Arc::new(InMemoryCacheStore::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let engine = AudioCacheEngine::new(
            AudioCacheConfig::default(),
            store.clone(),
            upstream.clone(),
            tx,
        )
        .arc();
        let router = RequestRouter::new(
            "/",
            engine.clone(),
            Arc::new(NetworkFirstCache::new("api", store.clone(), upstream.clone())),
            Arc::new(StaticAssetCache::new("static-", "v1", store, upstream.clone())),
            upstream.clone(),
        )
        .arc();
        let broker = MessageBroker::new(engine.clone()).arc();
        let state = Arc::new(AppState::new(engine, router, broker));
        (create_routes().with_state(state), upstream)
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = create_test_app();
        let request = Request::builder()
            .uri("/__cache/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn test_status_envelope() {
        let (app, _) = create_test_app();
        let request = Request::builder()
            .uri("/__cache/status")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["errno"], 0);
        assert_eq!(body["data"]["stats"]["cached_entries"], 0);
    }

    #[tokio::test]
    async fn test_fallback_proxies_through_router() {
        let (app, upstream) = create_test_app();
        upstream.respond(
            "/1/audio/a.mp3",
            crate::domain::ProxyResponse::new(200, b"mp3".to_vec()).with_header("content-type", "audio/mpeg"),
        );

        let request = Request::builder()
            .uri("/1/audio/a.mp3")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "audio/mpeg");
        assert_eq!(body_string(response).await, "mp3");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let (app, upstream) = create_test_app();
        upstream.fail("/folder/", "offline");

        let request = Request::builder().uri("/folder/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_delete_requires_path() {
        let (app, _) = create_test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/__cache/delete")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"path":""}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["errno"], 400);
    }
}
