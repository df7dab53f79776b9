//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::application::EngineStats;
use crate::domain::cache::PrefetchQueueItem;

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Cache DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub stats: EngineStats,
    pub queue: Vec<PrefetchQueueItem>,
    pub clients: usize,
}

#[derive(Debug, Deserialize)]
pub struct DeleteEntryRequest {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteEntryResponse {
    pub path: String,
    pub deleted: bool,
}
