//! HTTP Middleware
//!
//! 代理请求日志：4xx/5xx 状态、耗时，以及是否由缓存应答

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::application::CACHE_HIT_HEADER;

/// HTTP 状态码错误日志中间件
///
/// 业务错误（errno != 0）在 ApiError::into_response() 中记录
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let from_cache = response.headers().contains_key(CACHE_HIT_HEADER);

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            elapsed_ms = elapsed_ms,
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            elapsed_ms = elapsed_ms,
            "HTTP client error"
        );
    } else if from_cache {
        tracing::debug!(method = %method, uri = %uri, elapsed_ms = elapsed_ms, "Served from cache");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::util::ServiceExt;

    async fn cached_handler() -> ([(&'static str, &'static str); 1], &'static str) {
        ([(CACHE_HIT_HEADER, "hit")], "cached")
    }

    async fn upstream_down_handler() -> StatusCode {
        StatusCode::BAD_GATEWAY
    }

    async fn missing_handler() -> StatusCode {
        StatusCode::NOT_FOUND
    }

    fn create_test_router() -> Router {
        Router::new()
            .route("/cached", get(cached_handler))
            .route("/down", get(upstream_down_handler))
            .route("/missing", get(missing_handler))
            .layer(axum::middleware::from_fn(error_logging_middleware))
    }

    async fn status_of(uri: &str) -> StatusCode {
        let request = HttpRequest::builder().uri(uri).body(Body::empty()).unwrap();
        create_test_router().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_middleware_passes_responses_through() {
        assert_eq!(status_of("/cached").await, StatusCode::OK);
        assert_eq!(status_of("/missing").await, StatusCode::NOT_FOUND);
        assert_eq!(status_of("/down").await, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_cache_header_is_preserved() {
        let request = HttpRequest::builder().uri("/cached").body(Body::empty()).unwrap();
        let response = create_test_router().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[CACHE_HIT_HEADER], "hit");
    }
}
