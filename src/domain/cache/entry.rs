//! Cache Entry - 音频缓存条目

use serde::{Deserialize, Serialize};

/// 条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// 等待下载
    Queued,
    /// 正在下载
    Downloading,
    /// 已缓存
    Cached,
    /// 已取消
    Aborted,
    /// 下载或写入失败
    Failed,
}

impl EntryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Queued => "queued",
            EntryState::Downloading => "downloading",
            EntryState::Cached => "cached",
            EntryState::Aborted => "aborted",
            EntryState::Failed => "failed",
        }
    }

    /// 待处理或进行中的工作
    pub fn is_pending(&self) -> bool {
        matches!(self, EntryState::Queued | EntryState::Downloading)
    }

    /// 可以被新的 Prefetch 请求重新激活
    pub fn is_revivable(&self) -> bool {
        matches!(self, EntryState::Aborted | EntryState::Failed)
    }
}

/// 一个音频资源的缓存条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// 资源路径（唯一 key）
    pub path: String,
    /// 已缓存内容大小，仅在 Cached 时有意义
    pub size_bytes: u64,
    /// 逻辑访问时钟，越大越新
    pub last_access: u64,
    /// 写入顺序，LRU 平局时使用
    pub insert_order: u64,
    pub state: EntryState,
}

impl CacheEntry {
    pub fn queued(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size_bytes: 0,
            last_access: 0,
            insert_order: 0,
            state: EntryState::Queued,
        }
    }

    pub fn cached(path: impl Into<String>, size_bytes: u64, last_access: u64, insert_order: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            last_access,
            insert_order,
            state: EntryState::Cached,
        }
    }

    pub fn is_cached(&self) -> bool {
        self.state == EntryState::Cached
    }
}
