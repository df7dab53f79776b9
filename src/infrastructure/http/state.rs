//! Application State
//!
//! HTTP 层共享的服务句柄

use std::sync::Arc;

use crate::application::{AudioCacheEngine, RequestRouter};
use crate::infrastructure::events::MessageBroker;

/// 应用状态
pub struct AppState {
    pub engine: Arc<AudioCacheEngine>,
    pub router: Arc<RequestRouter>,
    pub broker: Arc<MessageBroker>,
}

impl AppState {
    pub fn new(
        engine: Arc<AudioCacheEngine>,
        router: Arc<RequestRouter>,
        broker: Arc<MessageBroker>,
    ) -> Self {
        Self {
            engine,
            router,
            broker,
        }
    }
}
