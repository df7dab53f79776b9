//! 存储在 Cache Store 中的响应格式

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::exchange::{is_hop_by_hop, ProxyResponse};

/// 持久化的响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// 写入时间（毫秒时间戳），重启后用于恢复 LRU 顺序
    pub stored_at: i64,
}

impl StoredResponse {
    pub fn from_response(response: &ProxyResponse) -> Self {
        Self {
            status: response.status,
            headers: response
                .headers
                .iter()
                .filter(|(k, _)| !is_hop_by_hop(k))
                .cloned()
                .collect(),
            body: response.body.clone(),
            stored_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    pub fn size_bytes(&self) -> u64 {
        self.body.len() as u64
    }

    pub fn into_response(self) -> ProxyResponse {
        ProxyResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}
