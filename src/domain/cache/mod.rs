//! Audio Cache Context - 音频缓存限界上下文
//!
//! 职责:
//! - 缓存条目及其状态
//! - 预取队列排序与裁剪
//! - LRU 淘汰选择
//! - 响应持久化格式

mod entry;
mod eviction;
mod queue;
mod stored;

pub use entry::{CacheEntry, EntryState};
pub use eviction::{plan_eviction, EvictionPlan, QuotaShortfall};
pub use queue::{PrefetchQueue, PrefetchQueueItem};
pub use stored::StoredResponse;
