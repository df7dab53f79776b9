//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（CacheStore、Upstream）
//! - services: 音频缓存引擎、API 缓存、静态资源缓存与请求路由
//! - error: 应用层错误定义

pub mod error;
pub mod ports;
pub mod services;

pub use error::CacheError;

pub use ports::{CacheStorePort, FetchError, StoreEntryInfo, StoreError, UpstreamPort};

pub use services::{
    AudioCacheConfig, AudioCacheEngine, Dispatch, EngineStats, InstallReport, NetworkFirstCache,
    RequestRouter, StaticAssetCache, CACHE_HIT_HEADER,
};
