//! Upstream Port - 上游网络请求
//!
//! 定义对真实音频服务的网络访问，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ProxyRequest, ProxyResponse};

/// 网络错误
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Upstream Port
///
/// 一次完整的请求/响应往返；非 2xx 状态仍是 Ok，只有请求未完成才是 Err
#[async_trait]
pub trait UpstreamPort: Send + Sync {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, FetchError>;
}
