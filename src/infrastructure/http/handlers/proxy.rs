//! Proxy Handler - 所有非 `/__cache` 请求的入口
//!
//! axum 请求 → ProxyRequest → RequestRouter → axum 响应

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::StatusCode,
    response::Response,
};
use std::sync::Arc;

use crate::domain::exchange::is_hop_by_hop;
use crate::domain::{ProxyRequest, ProxyResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 请求体上限 50MB
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

pub async fn proxy(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    let request = into_proxy_request(request).await?;
    let response = state.router.route(&request).await?;
    into_response(response)
}

async fn into_proxy_request(request: Request) -> Result<ProxyRequest, ApiError> {
    let (parts, body) = request.into_parts();

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read request body: {}", e)))?;

    Ok(ProxyRequest {
        method: parts.method.as_str().to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers,
        body: body.to_vec(),
    })
}

fn into_response(response: ProxyResponse) -> Result<Response, ApiError> {
    let status = StatusCode::from_u16(response.status)
        .map_err(|e| ApiError::BadGateway(format!("Invalid upstream status: {}", e)))?;

    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        if !is_hop_by_hop(name) {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }

    builder
        .body(Body::from(response.body))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}
