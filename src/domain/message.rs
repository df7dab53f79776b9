//! Cache Message Protocol - 引擎与前台客户端之间的控制消息
//!
//! JSON 格式: `{"kind": "Prefetch", "data": {...}}`

use serde::{Deserialize, Serialize};

use super::cache::{EntryState, PrefetchQueueItem};

/// 预取目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefetchTarget {
    pub path: String,
    /// 距当前播放位置的距离（1 = 下一个）
    #[serde(default)]
    pub distance: u32,
    /// 显式请求，不受 cache-ahead 窗口限制
    #[serde(default)]
    pub explicit: bool,
}

impl PrefetchTarget {
    pub fn new(path: impl Into<String>, distance: u32) -> Self {
        Self {
            path: path.into(),
            distance,
            explicit: false,
        }
    }

    pub fn explicit(path: impl Into<String>, distance: u32) -> Self {
        Self {
            path: path.into(),
            distance,
            explicit: true,
        }
    }
}

/// Prefetch 负载
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefetchRequest {
    pub items: Vec<PrefetchTarget>,
    /// 当前正在播放的资源路径
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playing: Option<String>,
}

/// AbortLoads 负载
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortLoads {
    pub path_prefix: String,
    #[serde(default)]
    pub keep_direct: bool,
}

/// Pong 负载
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PongData {
    pub pending_audio: Vec<PrefetchQueueItem>,
}

/// 控制消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum CacheMessage {
    /// 客户端 → 引擎: 请求预取
    Prefetch(PrefetchRequest),
    /// 客户端 → 引擎: 取消匹配前缀的加载
    AbortLoads(AbortLoads),
    /// 客户端 → 引擎: 存活检查
    Ping,
    /// 引擎 → 客户端: Ping 的回复
    Pong(PongData),
    /// 引擎 → 所有客户端: 条目状态变更
    #[serde(rename_all = "camelCase")]
    CacheUpdated {
        path: String,
        state: EntryState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// 引擎 → 所有客户端: 条目被淘汰或删除
    CacheEvicted { path: String },
}

impl CacheMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            CacheMessage::Prefetch(_) => "Prefetch",
            CacheMessage::AbortLoads(_) => "AbortLoads",
            CacheMessage::Ping => "Ping",
            CacheMessage::Pong(_) => "Pong",
            CacheMessage::CacheUpdated { .. } => "CacheUpdated",
            CacheMessage::CacheEvicted { .. } => "CacheEvicted",
        }
    }

    pub fn updated(path: impl Into<String>, state: EntryState) -> Self {
        CacheMessage::CacheUpdated {
            path: path.into(),
            state,
            error: None,
        }
    }

    pub fn failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        CacheMessage::CacheUpdated {
            path: path.into(),
            state: EntryState::Failed,
            error: Some(error.into()),
        }
    }
}
