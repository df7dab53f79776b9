//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod cache_store;
mod upstream;

pub use cache_store::{CacheStorePort, StoreEntryInfo, StoreError};
pub use upstream::{FetchError, UpstreamPort};
