//! HTTP Upstream Client - 转发请求到真实音频服务
//!
//! 实现 UpstreamPort trait，请求路径原样拼接到 base_url 之后

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;

use crate::application::ports::{FetchError, UpstreamPort};
use crate::domain::exchange::is_hop_by_hop;
use crate::domain::{ProxyRequest, ProxyResponse};

/// HTTP 上游客户端配置
#[derive(Debug, Clone)]
pub struct HttpUpstreamConfig {
    /// 上游服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpUpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 60,
        }
    }
}

impl HttpUpstreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

pub struct HttpUpstreamClient {
    client: Client,
    config: HttpUpstreamConfig,
}

impl HttpUpstreamClient {
    pub fn new(config: HttpUpstreamConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url_for(&self, request: &ProxyRequest) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            request.path_and_query()
        )
    }
}

#[async_trait]
impl UpstreamPort for HttpUpstreamClient {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, FetchError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::InvalidResponse(format!("Bad method: {}", e)))?;
        let url = self.url_for(request);

        tracing::debug!(method = %method, url = %url, "Forwarding request upstream");

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            if !is_hop_by_hop(name) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_connect() {
                FetchError::NetworkError(format!("Cannot connect to upstream: {}", e))
            } else {
                FetchError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::InvalidResponse(format!("Failed to read body: {}", e))
                }
            })?
            .to_vec();

        tracing::debug!(url = %url, status = status, size_bytes = body.len(), "Upstream responded");

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = HttpUpstreamConfig::new("http://example.com:9000/").with_timeout(5);
        assert_eq!(config.timeout_secs, 5);

        let client = HttpUpstreamClient::new(config).unwrap();
        let req = ProxyRequest::get("/1/audio/a.mp3?trans=m");
        assert_eq!(
            client.url_for(&req),
            "http://example.com:9000/1/audio/a.mp3?trans=m"
        );
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_network_error() {
        let client = HttpUpstreamClient::new(HttpUpstreamConfig::new("http://127.0.0.1:1").with_timeout(2))
            .unwrap();
        let err = client.fetch(&ProxyRequest::get("/folder/")).await.unwrap_err();
        assert!(matches!(err, FetchError::NetworkError(_) | FetchError::Timeout));
    }
}
