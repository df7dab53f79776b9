//! Static Asset Cache - 静态资源与默认处理
//!
//! - install: 预缓存静态资源列表到 `<prefix><version>` 命名空间
//! - activate: 清理旧版本的静态资源命名空间
//! - handle_request: 先查缓存，未命中则请求网络（不回写）

use std::sync::Arc;

use crate::application::error::CacheError;
use crate::application::ports::{CacheStorePort, UpstreamPort};
use crate::domain::cache::StoredResponse;
use crate::domain::{ProxyRequest, ProxyResponse};

/// install 结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub cached: usize,
    pub failed: Vec<String>,
}

pub struct StaticAssetCache {
    prefix: String,
    namespace: String,
    store: Arc<dyn CacheStorePort>,
    upstream: Arc<dyn UpstreamPort>,
}

impl StaticAssetCache {
    pub fn new(
        prefix: impl Into<String>,
        version: &str,
        store: Arc<dyn CacheStorePort>,
        upstream: Arc<dyn UpstreamPort>,
    ) -> Self {
        let prefix = prefix.into();
        let namespace = format!("{}{}", prefix, version);
        Self {
            prefix,
            namespace,
            store,
            upstream,
        }
    }

    /// 预缓存静态资源，单个失败不影响其他资源
    pub async fn install(&self, resources: &[String]) -> InstallReport {
        let mut report = InstallReport::default();

        for path in resources {
            let request = ProxyRequest::get(path);
            let stored = match self.upstream.fetch(&request).await {
                Ok(response) if response.is_success() => self.save(&request.cache_key(), &response).await,
                Ok(response) => Err(CacheError::network(format!("HTTP {}", response.status))),
                Err(e) => Err(e.into()),
            };
            match stored {
                Ok(()) => report.cached += 1,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Failed to precache static resource");
                    report.failed.push(path.clone());
                }
            }
        }

        tracing::info!(
            namespace = %self.namespace,
            cached = report.cached,
            failed = report.failed.len(),
            "Static resources installed"
        );
        report
    }

    /// 删除旧版本的静态资源命名空间，返回删除数量
    pub async fn activate(&self) -> Result<usize, CacheError> {
        let mut purged = 0;
        for namespace in self.store.namespaces().await? {
            if namespace.starts_with(&self.prefix) && namespace != self.namespace {
                self.store.drop_namespace(&namespace).await?;
                tracing::info!(namespace = %namespace, "Purged stale static cache");
                purged += 1;
            }
        }
        Ok(purged)
    }

    pub async fn handle_request(&self, request: &ProxyRequest) -> Result<ProxyResponse, CacheError> {
        if request.is_get() {
            match self.store.get(&self.namespace, &request.cache_key()).await {
                Ok(Some(bytes)) => match StoredResponse::decode(&bytes) {
                    Ok(stored) => return Ok(stored.into_response()),
                    Err(e) => {
                        tracing::warn!(path = %request.path, error = %e, "Corrupted static entry");
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %request.path, error = %e, "Static cache lookup failed");
                }
            }
        }

        tracing::debug!(path = %request.path, "Other request passed to network");
        Ok(self.upstream.fetch(request).await?)
    }

    async fn save(&self, key: &str, response: &ProxyResponse) -> Result<(), CacheError> {
        let encoded = StoredResponse::from_response(response).encode()?;
        self.store.put(&self.namespace, key, encoded).await?;
        Ok(())
    }
}
