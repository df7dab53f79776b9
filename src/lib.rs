//! SoundCache - 音频流客户端的离线缓存代理
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - cache: 缓存条目、预取队列、LRU 淘汰计划、响应编码
//! - routing: 音频 / API / 其他 路径分类
//! - message: 引擎与客户端之间的控制消息
//!
//! 应用层 (application/):
//! - Ports: CacheStore, Upstream
//! - Services: AudioCacheEngine, NetworkFirstCache, StaticAssetCache, RequestRouter
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: 代理入口 + 控制 WebSocket
//! - Events: MessageBroker
//! - Persistence: Sled 存储
//! - Memory: 内存存储
//! - Adapters: reqwest 上游客户端

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
