//! In-Memory Cache Store Implementation
//!
//! 进程内的 Cache Store，`cache.in_memory = true` 时使用，也用于测试

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::application::ports::{CacheStorePort, StoreEntryInfo, StoreError};

/// 内存 Cache Store
pub struct InMemoryCacheStore {
    namespaces: DashMap<String, BTreeMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self {
            namespaces: DashMap::new(),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 让后续写入失败（模拟磁盘写满）
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 所有命名空间中都没有条目
    pub fn is_empty(&self) -> bool {
        self.namespaces.iter().all(|ns| ns.value().is_empty())
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStorePort for InMemoryCacheStore {
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::IoError("write rejected".to_string()));
        }
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .namespaces
            .get(namespace)
            .and_then(|ns| ns.get(key).cloned()))
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .namespaces
            .get_mut(namespace)
            .map(|mut ns| ns.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn entries(&self, namespace: &str) -> Result<Vec<StoreEntryInfo>, StoreError> {
        Ok(self
            .namespaces
            .get(namespace)
            .map(|ns| {
                ns.iter()
                    .map(|(key, value)| StoreEntryInfo {
                        key: key.clone(),
                        size_bytes: value.len() as u64,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn namespaces(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.namespaces.iter().map(|ns| ns.key().clone()).collect())
    }

    async fn drop_namespace(&self, namespace: &str) -> Result<bool, StoreError> {
        Ok(self.namespaces.remove(namespace).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = InMemoryCacheStore::new();
        store.put("audio", "/a", vec![1, 2]).await.unwrap();
        store.put("api", "/a", vec![3]).await.unwrap();

        assert_eq!(store.get("audio", "/a").await.unwrap(), Some(vec![1, 2]));
        assert_eq!(store.size_of("api").await.unwrap(), 1);
        assert!(store.delete("audio", "/a").await.unwrap());
        assert_eq!(store.get("api", "/a").await.unwrap(), Some(vec![3]));
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let store = InMemoryCacheStore::new();
        store.fail_writes(true);
        assert!(store.put("audio", "/a", vec![1]).await.is_err());
        assert!(store.is_empty());

        store.fail_writes(false);
        store.put("audio", "/a", vec![1]).await.unwrap();
        assert!(!store.is_empty());
    }
}
