//! Cache Store Port - 命名空间化的持久 KV 存储
//!
//! 由宿主提供的字节块存储，按缓存名（namespace）隔离。
//! 具体实现见 infrastructure/persistence (Sled) 与 infrastructure/memory

use async_trait::async_trait;
use thiserror::Error;

/// Cache Store 错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 条目概要（枚举 + 大小查询）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntryInfo {
    pub key: String,
    pub size_bytes: u64,
}

/// Cache Store Port
#[async_trait]
pub trait CacheStorePort: Send + Sync {
    /// 写入（覆盖同 key 的旧值）
    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// 删除，返回是否存在
    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, StoreError>;

    /// 枚举命名空间中的所有条目
    async fn entries(&self, namespace: &str) -> Result<Vec<StoreEntryInfo>, StoreError>;

    /// 命名空间占用的总字节数
    async fn size_of(&self, namespace: &str) -> Result<u64, StoreError> {
        Ok(self
            .entries(namespace)
            .await?
            .iter()
            .map(|e| e.size_bytes)
            .sum())
    }

    /// 所有已存在的命名空间
    async fn namespaces(&self) -> Result<Vec<String>, StoreError>;

    /// 删除整个命名空间
    async fn drop_namespace(&self, namespace: &str) -> Result<bool, StoreError>;
}
