//! Application Services - 缓存策略
//!
//! - AudioCacheEngine: 音频预取队列 + LRU 淘汰
//! - NetworkFirstCache: API 请求，网络优先
//! - StaticAssetCache: 静态资源，缓存优先
//! - RequestRouter: 按路径把请求分发到以上三者

mod audio_cache;
mod network_first;
mod router;
mod static_assets;

pub use audio_cache::{AudioCacheConfig, AudioCacheEngine, EngineStats};
pub use network_first::{NetworkFirstCache, CACHE_HIT_HEADER};
pub use router::{Dispatch, RequestRouter};
pub use static_assets::{InstallReport, StaticAssetCache};
