//! Network-First Cache - API 请求缓存
//!
//! 先请求网络，成功则写入缓存并返回；网络失败时返回最近一次缓存的响应

use std::sync::Arc;

use crate::application::error::CacheError;
use crate::application::ports::{CacheStorePort, UpstreamPort};
use crate::domain::cache::StoredResponse;
use crate::domain::{ProxyRequest, ProxyResponse};

/// 缓存命中时附加的响应头
pub const CACHE_HIT_HEADER: &str = "x-soundcache";

pub struct NetworkFirstCache {
    namespace: String,
    store: Arc<dyn CacheStorePort>,
    upstream: Arc<dyn UpstreamPort>,
}

impl NetworkFirstCache {
    pub fn new(
        namespace: impl Into<String>,
        store: Arc<dyn CacheStorePort>,
        upstream: Arc<dyn UpstreamPort>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            store,
            upstream,
        }
    }

    pub async fn handle_request(&self, request: &ProxyRequest) -> Result<ProxyResponse, CacheError> {
        let key = request.cache_key();

        match self.upstream.fetch(request).await {
            Ok(response) => {
                if request.is_get() && response.is_success() {
                    self.backup(&key, &response).await;
                }
                Ok(response)
            }
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "API request failed, trying cache");
                if !request.is_get() {
                    return Err(e.into());
                }
                match self.lookup(&key).await {
                    Some(response) => {
                        tracing::info!(key = %key, "API response served from cache");
                        Ok(response.with_header(CACHE_HIT_HEADER, "hit"))
                    }
                    None => Err(e.into()),
                }
            }
        }
    }

    async fn backup(&self, key: &str, response: &ProxyResponse) {
        let encoded = match StoredResponse::from_response(response).encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode API response");
                return;
            }
        };
        if let Err(e) = self.store.put(&self.namespace, key, encoded).await {
            tracing::warn!(key = %key, error = %e, "Failed to cache API response");
        }
    }

    async fn lookup(&self, key: &str) -> Option<ProxyResponse> {
        let bytes = match self.store.get(&self.namespace, key).await {
            Ok(found) => found?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read cached API response");
                return None;
            }
        };
        StoredResponse::decode(&bytes)
            .map(StoredResponse::into_response)
            .map_err(|e| tracing::warn!(key = %key, error = %e, "Corrupted cached API response"))
            .ok()
    }
}
