//! 应用层错误定义
//!
//! 缓存服务统一的错误类型，任何一种都不会使进程退出：
//! 最坏情况是某个资源保持未缓存，或某个客户端没有收到通知

use thiserror::Error;

use crate::application::ports::{FetchError, StoreError};
use crate::domain::cache::QuotaShortfall;

/// 应用层错误
#[derive(Debug, Error)]
pub enum CacheError {
    /// 网络请求未完成
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// 单个资源超过配额（淘汰所有可淘汰条目后仍放不下）
    #[error("Quota exceeded: {size} bytes does not fit in {limit} bytes ({pinned} bytes pinned)")]
    QuotaExceeded { size: u64, limit: u64, pinned: u64 },

    /// 持久存储读写失败
    #[error("Store failure: {0}")]
    StoreFailure(String),

    /// 被 AbortLoads 取消
    #[error("Aborted: {0}")]
    Aborted(String),
}

impl CacheError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkFailure(message.into())
    }
}

impl From<FetchError> for CacheError {
    fn from(err: FetchError) -> Self {
        Self::NetworkFailure(err.to_string())
    }
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        Self::StoreFailure(err.to_string())
    }
}

impl From<QuotaShortfall> for CacheError {
    fn from(err: QuotaShortfall) -> Self {
        Self::QuotaExceeded {
            size: err.incoming,
            limit: err.limit,
            pinned: err.pinned_bytes,
        }
    }
}

impl From<bincode::Error> for CacheError {
    fn from(err: bincode::Error) -> Self {
        Self::StoreFailure(format!("Corrupted cache entry: {}", err))
    }
}
