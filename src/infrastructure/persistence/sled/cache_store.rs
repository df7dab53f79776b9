//! Sled-based Cache Store Implementation
//!
//! 每个命名空间对应一个 sled Tree，key 为请求标识，value 为编码后的响应

use async_trait::async_trait;
use sled::{Db, Tree};
use std::sync::Arc;

use crate::application::ports::{CacheStorePort, StoreEntryInfo, StoreError};

/// Sled 存储配置
#[derive(Debug, Clone)]
pub struct SledCacheConfig {
    /// 数据库路径
    pub db_path: String,
}

impl Default for SledCacheConfig {
    fn default() -> Self {
        Self {
            db_path: "data/cache.sled".to_string(),
        }
    }
}

fn db_error(e: sled::Error) -> StoreError {
    StoreError::DatabaseError(e.to_string())
}

/// Sled Cache Store
pub struct SledCacheStore {
    db: Db,
}

impl SledCacheStore {
    pub fn new(config: &SledCacheConfig) -> Result<Self, StoreError> {
        let db = sled::open(&config.db_path).map_err(db_error)?;

        tracing::info!(
            db_path = %config.db_path,
            trees = db.tree_names().len(),
            "SledCacheStore initialized"
        );

        Ok(Self { db })
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn tree(&self, namespace: &str) -> Result<Tree, StoreError> {
        self.db.open_tree(namespace).map_err(db_error)
    }

    /// 已存在的命名空间（不会创建新的 Tree）
    fn has_tree(&self, namespace: &str) -> bool {
        self.db
            .tree_names()
            .iter()
            .any(|name| &name[..] == namespace.as_bytes())
    }

    /// 刷新数据库
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().map_err(db_error)?;
        Ok(())
    }
}

#[async_trait]
impl CacheStorePort for SledCacheStore {
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let size = value.len();
        self.tree(namespace)?.insert(key, value).map_err(db_error)?;

        tracing::debug!(namespace = %namespace, key = %key, size_bytes = size, "Entry stored");
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if !self.has_tree(namespace) {
            return Ok(None);
        }
        let value = self.tree(namespace)?.get(key).map_err(db_error)?;
        Ok(value.map(|v| v.to_vec()))
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        if !self.has_tree(namespace) {
            return Ok(false);
        }
        let removed = self.tree(namespace)?.remove(key).map_err(db_error)?;
        Ok(removed.is_some())
    }

    async fn entries(&self, namespace: &str) -> Result<Vec<StoreEntryInfo>, StoreError> {
        if !self.has_tree(namespace) {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for item in self.tree(namespace)?.iter() {
            let (key, value) = item.map_err(db_error)?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| StoreError::SerializationError(e.to_string()))?;
            entries.push(StoreEntryInfo {
                key,
                size_bytes: value.len() as u64,
            });
        }
        Ok(entries)
    }

    async fn namespaces(&self) -> Result<Vec<String>, StoreError> {
        let default = self.db.name();
        let names = self
            .db
            .tree_names()
            .into_iter()
            .filter(|name| *name != default)
            .filter_map(|name| String::from_utf8(name.to_vec()).ok())
            .collect();
        Ok(names)
    }

    async fn drop_namespace(&self, namespace: &str) -> Result<bool, StoreError> {
        if !self.has_tree(namespace) {
            return Ok(false);
        }
        let dropped = self.db.drop_tree(namespace).map_err(db_error)?;
        tracing::info!(namespace = %namespace, dropped = dropped, "Namespace dropped");
        Ok(dropped)
    }
}
