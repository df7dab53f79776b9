//! Domain Layer - 领域层
//!
//! - cache: 音频缓存上下文（条目、预取队列、LRU 淘汰、持久化格式）
//! - exchange: 被拦截的请求与响应
//! - message: 客户端控制消息协议
//! - routing: 请求路径分类

pub mod cache;
pub mod exchange;
pub mod message;
pub mod routing;

pub use exchange::{ProxyRequest, ProxyResponse};
pub use message::{AbortLoads, CacheMessage, PongData, PrefetchRequest, PrefetchTarget};
